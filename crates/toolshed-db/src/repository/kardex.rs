//! # Kardex Repository
//!
//! Append-only inventory ledger. There is no update or delete here, and the
//! schema triggers refuse both anyway.
//!
//! Entries come back in recording order: `occurred_at`, then the insertion
//! sequence for entries recorded in the same instant.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use toolshed_core::{KardexEntry, MovementType};

#[derive(Debug, Clone, Copy)]
pub struct KardexRepository;

impl KardexRepository {
    /// Appends one movement.
    pub async fn append(conn: &mut SqliteConnection, entry: &KardexEntry) -> DbResult<()> {
        debug!(
            tool_id = %entry.tool_id,
            movement = %entry.movement_type,
            quantity = entry.quantity,
            "Recording kardex movement"
        );

        sqlx::query(
            r#"
            INSERT INTO kardex (id, tool_id, movement_type, quantity, occurred_at, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tool_id)
        .bind(entry.movement_type)
        .bind(entry.quantity)
        .bind(entry.occurred_at)
        .bind(&entry.user_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> DbResult<Vec<KardexEntry>> {
        let entries = sqlx::query_as::<_, KardexEntry>(
            r#"
            SELECT id, tool_id, movement_type, quantity, occurred_at, user_id
            FROM kardex
            ORDER BY occurred_at, seq
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    pub async fn list_by_tool(
        conn: &mut SqliteConnection,
        tool_id: &str,
    ) -> DbResult<Vec<KardexEntry>> {
        let entries = sqlx::query_as::<_, KardexEntry>(
            r#"
            SELECT id, tool_id, movement_type, quantity, occurred_at, user_id
            FROM kardex
            WHERE tool_id = ?1
            ORDER BY occurred_at, seq
            "#,
        )
        .bind(tool_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    /// Movements recorded between `start` and `end`, both inclusive.
    pub async fn list_by_range(
        conn: &mut SqliteConnection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<KardexEntry>> {
        let entries = sqlx::query_as::<_, KardexEntry>(
            r#"
            SELECT id, tool_id, movement_type, quantity, occurred_at, user_id
            FROM kardex
            WHERE occurred_at >= ?1 AND occurred_at <= ?2
            ORDER BY occurred_at, seq
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    pub async fn list_by_tool_and_type(
        conn: &mut SqliteConnection,
        tool_id: &str,
        movement_type: MovementType,
    ) -> DbResult<Vec<KardexEntry>> {
        let entries = sqlx::query_as::<_, KardexEntry>(
            r#"
            SELECT id, tool_id, movement_type, quantity, occurred_at, user_id
            FROM kardex
            WHERE tool_id = ?1 AND movement_type = ?2
            ORDER BY occurred_at, seq
            "#,
        )
        .bind(tool_id)
        .bind(movement_type)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    /// Number of movements of a tool.
    pub async fn count_for_tool(conn: &mut SqliteConnection, tool_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kardex WHERE tool_id = ?1")
            .bind(tool_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::ToolRepository;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use toolshed_core::{Money, NewTool, Tool};

    async fn seed_tool(conn: &mut SqliteConnection) -> Tool {
        let tool = Tool::register(
            NewTool {
                name: "Sierra circular".to_string(),
                category: "Electric".to_string(),
                replacement_value: Money::new(60000),
                stock: 1,
            },
            Utc::now(),
        );
        ToolRepository::insert(conn, &tool).await.unwrap();
        tool
    }

    #[tokio::test]
    async fn test_entries_come_back_in_recording_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let tool = seed_tool(&mut conn).await;

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        // Same instant: order falls back to insertion sequence
        for movement in [MovementType::Income, MovementType::Loan, MovementType::Return] {
            KardexRepository::append(
                &mut conn,
                &KardexEntry::record(&tool.id, movement, 1, "system", at),
            )
            .await
            .unwrap();
        }

        let entries = KardexRepository::list_by_tool(&mut conn, &tool.id)
            .await
            .unwrap();
        let kinds: Vec<MovementType> = entries.iter().map(|e| e.movement_type).collect();
        assert_eq!(
            kinds,
            vec![MovementType::Income, MovementType::Loan, MovementType::Return]
        );

        let loans =
            KardexRepository::list_by_tool_and_type(&mut conn, &tool.id, MovementType::Loan)
                .await
                .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(KardexRepository::count_for_tool(&mut conn, &tool.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let tool = seed_tool(&mut conn).await;

        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        for offset in [0, 1, 2] {
            KardexRepository::append(
                &mut conn,
                &KardexEntry::record(
                    &tool.id,
                    MovementType::Income,
                    1,
                    "system",
                    start + Duration::days(offset),
                ),
            )
            .await
            .unwrap();
        }

        let hits =
            KardexRepository::list_by_range(&mut conn, start, start + Duration::days(1))
                .await
                .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(KardexRepository::list_all(&mut conn).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_entries_cannot_be_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let tool = seed_tool(&mut conn).await;

        KardexRepository::append(
            &mut conn,
            &KardexEntry::record(&tool.id, MovementType::Income, 1, "system", Utc::now()),
        )
        .await
        .unwrap();

        let err: DbError = sqlx::query("DELETE FROM kardex")
            .execute(&mut *conn)
            .await
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("immutable"));
    }
}
