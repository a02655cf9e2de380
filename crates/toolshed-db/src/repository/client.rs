//! # Client Repository
//!
//! Persistence for clients. The RUT is unique at the schema level; status
//! and contact changes are version-checked like tools.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use toolshed_core::{Client, ClientStatus};

#[derive(Debug, Clone, Copy)]
pub struct ClientRepository;

impl ClientRepository {
    /// Inserts a newly registered client.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the RUT is taken.
    pub async fn insert(conn: &mut SqliteConnection, client: &Client) -> DbResult<()> {
        debug!(client_id = %client.id, rut = %client.rut, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, rut, name, phone, email, status, created_at, updated_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.rut)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(client.status)
        .bind(client.created_at)
        .bind(client.updated_at)
        .bind(client.version)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &client.rut),
            other => other,
        })?;

        Ok(())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, rut, name, phone, email, status, created_at, updated_at, version
            FROM clients
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(client)
    }

    /// Looks a client up by normalised RUT.
    pub async fn get_by_rut(conn: &mut SqliteConnection, rut: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, rut, name, phone, email, status, created_at, updated_at, version
            FROM clients
            WHERE rut = ?1
            "#,
        )
        .bind(rut)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(client)
    }

    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, rut, name, phone, email, status, created_at, updated_at, version
            FROM clients
            ORDER BY name, rut
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(clients)
    }

    pub async fn list_by_status(
        conn: &mut SqliteConnection,
        status: ClientStatus,
    ) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, rut, name, phone, email, status, created_at, updated_at, version
            FROM clients
            WHERE status = ?1
            ORDER BY name, rut
            "#,
        )
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        Ok(clients)
    }

    /// Writes contact data and status, version-checked. The RUT never
    /// changes after registration.
    ///
    /// ## Returns
    /// The client as stored, with `version` bumped.
    pub async fn update(conn: &mut SqliteConnection, client: &Client) -> DbResult<Client> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?1,
                phone = ?2,
                email = ?3,
                status = ?4,
                updated_at = ?5,
                version = version + 1
            WHERE id = ?6 AND version = ?7
            "#,
        )
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(client.status)
        .bind(client.updated_at)
        .bind(&client.id)
        .bind(client.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Client", &client.id));
        }

        debug!(client_id = %client.id, status = %client.status, "Client updated");

        let mut saved = client.clone();
        saved.version += 1;
        Ok(saved)
    }

    /// Bumps the version without changing data.
    ///
    /// Loan creation calls this so that two transactions opening loans for
    /// the same client cannot both pass the active-loan ceiling: the second
    /// one to write finds a new version and fails with `Conflict`.
    pub async fn touch(conn: &mut SqliteConnection, client: &Client) -> DbResult<Client> {
        let result = sqlx::query(
            "UPDATE clients SET version = version + 1 WHERE id = ?1 AND version = ?2",
        )
        .bind(&client.id)
        .bind(client.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Client", &client.id));
        }

        let mut saved = client.clone();
        saved.version += 1;
        Ok(saved)
    }
}
