//! # Tariff Repository
//!
//! The tariff table holds at most one row, keyed [`toolshed_core::TARIFF_KEY`].

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use toolshed_core::{Tariff, TARIFF_KEY};

#[derive(Debug, Clone, Copy)]
pub struct TariffRepository;

impl TariffRepository {
    /// Returns the active tariff, or `None` before the first configuration.
    pub async fn get(conn: &mut SqliteConnection) -> DbResult<Option<Tariff>> {
        let tariff = sqlx::query_as::<_, Tariff>(
            r#"
            SELECT id, daily_rental_fee, daily_late_fee, repair_fee, updated_at
            FROM tariffs
            WHERE id = ?1
            "#,
        )
        .bind(TARIFF_KEY)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(tariff)
    }

    /// Creates the tariff row or replaces all three fees at once.
    pub async fn upsert(conn: &mut SqliteConnection, tariff: &Tariff) -> DbResult<()> {
        debug!(
            rental = %tariff.daily_rental_fee,
            late = %tariff.daily_late_fee,
            repair = %tariff.repair_fee,
            "Writing tariff"
        );

        sqlx::query(
            r#"
            INSERT INTO tariffs (id, daily_rental_fee, daily_late_fee, repair_fee, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                daily_rental_fee = excluded.daily_rental_fee,
                daily_late_fee = excluded.daily_late_fee,
                repair_fee = excluded.repair_fee,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tariff.id)
        .bind(tariff.daily_rental_fee)
        .bind(tariff.daily_late_fee)
        .bind(tariff.repair_fee)
        .bind(tariff.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
