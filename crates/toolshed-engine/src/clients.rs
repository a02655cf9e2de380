//! # Client Registry
//!
//! Registration, contact updates and standing of clients.
//!
//! Status changes here are unconditional. The rules about *when* a client
//! becomes restricted or active again live in the loan engine.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use toolshed_core::validation::{normalize_rut, validate_client_details, validate_new_client};
use toolshed_core::{Client, ClientDetails, ClientStatus, Clock, CoreError, NewClient};
use toolshed_db::{ClientRepository, Database};

use crate::error::EngineResult;

/// Loads a client or fails with `NotFound`.
pub(crate) async fn require_client(
    conn: &mut SqliteConnection,
    client_id: &str,
) -> EngineResult<Client> {
    ClientRepository::get_by_id(conn, client_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Client", client_id).into())
}

#[derive(Clone)]
pub struct ClientRegistry {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl ClientRegistry {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        ClientRegistry { db, clock }
    }

    pub async fn get_by_id(&self, client_id: &str) -> EngineResult<Client> {
        let mut conn = self.db.acquire().await?;
        require_client(&mut conn, client_id).await
    }

    /// Looks up by RUT in any accepted spelling (`12.345.678-5`, `12345678-5`).
    pub async fn get_by_rut(&self, rut: &str) -> EngineResult<Client> {
        let rut = normalize_rut(rut)?;
        let mut conn = self.db.acquire().await?;
        ClientRepository::get_by_rut(&mut conn, &rut)
            .await?
            .ok_or_else(|| CoreError::not_found("Client", rut).into())
    }

    /// Registers a client as ACTIVE.
    ///
    /// ## Errors
    /// - `Validation` for a missing field, bad RUT, phone or email
    /// - `AlreadyExists` if the RUT is taken
    pub async fn create(&self, input: NewClient) -> EngineResult<Client> {
        let rut = validate_new_client(&input)?;

        let mut tx = self.db.begin().await?;
        if ClientRepository::get_by_rut(&mut tx, &rut).await?.is_some() {
            return Err(CoreError::AlreadyExists {
                field: "rut".to_string(),
                value: rut,
            }
            .into());
        }

        let client = Client::register(input, rut, self.clock.now());
        ClientRepository::insert(&mut tx, &client).await?;
        tx.commit().await?;

        info!(client_id = %client.id, rut = %client.rut, "Client registered");
        Ok(client)
    }

    /// Changes name, phone and email. RUT and status are untouched.
    pub async fn update_details(
        &self,
        client_id: &str,
        details: ClientDetails,
    ) -> EngineResult<Client> {
        validate_client_details(&details)?;

        let mut tx = self.db.begin().await?;
        let mut client = require_client(&mut tx, client_id).await?;
        client.name = details.name.trim().to_string();
        client.phone = details.phone.trim().to_string();
        client.email = details.email.trim().to_string();
        client.updated_at = self.clock.now();
        let saved = ClientRepository::update(&mut tx, &client).await?;
        tx.commit().await?;

        info!(client_id = %saved.id, "Client details updated");
        Ok(saved)
    }

    /// Sets the status, whatever it was before.
    pub async fn update_status(
        &self,
        client_id: &str,
        status: ClientStatus,
    ) -> EngineResult<Client> {
        let mut tx = self.db.begin().await?;
        let client = require_client(&mut tx, client_id).await?;
        let saved = self.set_status(&mut tx, client, status).await?;
        tx.commit().await?;

        info!(client_id = %saved.id, status = %saved.status, "Client status updated");
        Ok(saved)
    }

    /// Status write inside the caller's transaction.
    pub(crate) async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        mut client: Client,
        status: ClientStatus,
    ) -> EngineResult<Client> {
        client.status = status;
        client.updated_at = self.clock.now();
        Ok(ClientRepository::update(conn, &client).await?)
    }

    /// All clients ordered by name.
    pub async fn list_clients(&self) -> EngineResult<Vec<Client>> {
        let mut conn = self.db.acquire().await?;
        let clients = ClientRepository::list(&mut conn).await?;
        debug!(count = clients.len(), "Clients listed");
        Ok(clients)
    }

    pub async fn restricted_clients(&self) -> EngineResult<Vec<Client>> {
        let mut conn = self.db.acquire().await?;
        Ok(ClientRepository::list_by_status(&mut conn, ClientStatus::Restricted).await?)
    }
}
