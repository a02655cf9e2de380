//! # Tool Repository
//!
//! Persistence for tools. Stock and status are written here but decided in
//! `toolshed_core::inventory`; every update is version-checked.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use toolshed_core::Tool;

/// Database operations for tools.
///
/// ## Usage
/// ```rust,ignore
/// let mut tx = db.begin().await?;
/// let tool = ToolRepository::get_by_id(&mut tx, &id).await?;
/// let saved = ToolRepository::update(&mut tx, &changed).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ToolRepository;

impl ToolRepository {
    /// Inserts a newly registered tool.
    pub async fn insert(conn: &mut SqliteConnection, tool: &Tool) -> DbResult<()> {
        debug!(tool_id = %tool.id, name = %tool.name, stock = tool.stock, "Inserting tool");

        sqlx::query(
            r#"
            INSERT INTO tools (
                id, name, category, status, stock, replacement_value,
                created_at, updated_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&tool.id)
        .bind(&tool.name)
        .bind(&tool.category)
        .bind(tool.status)
        .bind(tool.stock)
        .bind(tool.replacement_value)
        .bind(tool.created_at)
        .bind(tool.updated_at)
        .bind(tool.version)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a tool by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Tool))` - Tool found
    /// * `Ok(None)` - Tool not found
    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Tool>> {
        let tool = sqlx::query_as::<_, Tool>(
            r#"
            SELECT id, name, category, status, stock, replacement_value,
                   created_at, updated_at, version
            FROM tools
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(tool)
    }

    /// Lists every tool, decommissioned ones included, ordered by name.
    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Tool>> {
        let tools = sqlx::query_as::<_, Tool>(
            r#"
            SELECT id, name, category, status, stock, replacement_value,
                   created_at, updated_at, version
            FROM tools
            ORDER BY name, created_at
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(tools)
    }

    /// Counts tools (used by the seeder to skip a populated database).
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// Writes every mutable column of `tool` if nobody else changed the row
    /// since it was read.
    ///
    /// ## Returns
    /// The tool as stored, with `version` bumped.
    ///
    /// ## Errors
    /// `DbError::Conflict` when the stored version differs from `tool.version`.
    pub async fn update(conn: &mut SqliteConnection, tool: &Tool) -> DbResult<Tool> {
        let result = sqlx::query(
            r#"
            UPDATE tools
            SET name = ?1,
                category = ?2,
                status = ?3,
                stock = ?4,
                replacement_value = ?5,
                updated_at = ?6,
                version = version + 1
            WHERE id = ?7 AND version = ?8
            "#,
        )
        .bind(&tool.name)
        .bind(&tool.category)
        .bind(tool.status)
        .bind(tool.stock)
        .bind(tool.replacement_value)
        .bind(tool.updated_at)
        .bind(&tool.id)
        .bind(tool.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Tool", &tool.id));
        }

        debug!(
            tool_id = %tool.id,
            status = %tool.status,
            stock = tool.stock,
            version = tool.version + 1,
            "Tool updated"
        );

        let mut saved = tool.clone();
        saved.version += 1;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use toolshed_core::{Money, NewTool, ToolStatus};

    fn sample_tool() -> Tool {
        Tool::register(
            NewTool {
                name: "Esmeril angular".to_string(),
                category: "Electric".to_string(),
                replacement_value: Money::new(45000),
                stock: 2,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let tool = sample_tool();

        ToolRepository::insert(&mut conn, &tool).await.unwrap();
        let loaded = ToolRepository::get_by_id(&mut conn, &tool.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.name, "Esmeril angular");
        assert_eq!(loaded.status, ToolStatus::Available);
        assert_eq!(loaded.replacement_value, Money::new(45000));
        assert_eq!(ToolRepository::count(&mut conn).await.unwrap(), 1);
        assert!(ToolRepository::get_by_id(&mut conn, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let tool = sample_tool();
        ToolRepository::insert(&mut conn, &tool).await.unwrap();

        let mut first = tool.clone();
        first.stock = 1;
        let saved = ToolRepository::update(&mut conn, &first).await.unwrap();
        assert_eq!(saved.version, 1);

        // Second writer still holds version 0
        let mut stale = tool.clone();
        stale.stock = 0;
        let err = ToolRepository::update(&mut conn, &stale).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let stored = ToolRepository::get_by_id(&mut conn, &tool.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.stock, 1);
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_by_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut tool = sample_tool();
        tool.stock = -1;

        let err = ToolRepository::insert(&mut conn, &tool).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
