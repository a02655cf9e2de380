//! # Tariff Provider
//!
//! Reads and replaces the single active tariff. Returns are priced against
//! whatever row is current inside the return's own transaction.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use toolshed_core::validation::validate_tariff;
use toolshed_core::{Clock, CoreError, Tariff, TariffValues, TARIFF_KEY};
use toolshed_db::{Database, TariffRepository};

use crate::error::EngineResult;

#[derive(Clone)]
pub struct TariffProvider {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl TariffProvider {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        TariffProvider { db, clock }
    }

    /// Returns the active tariff.
    ///
    /// ## Errors
    /// `CoreError::TariffNotConfigured` before the first `update_tariff`.
    pub async fn get_tariff(&self) -> EngineResult<Tariff> {
        let mut conn = self.db.acquire().await?;
        current(&mut conn).await
    }

    /// Replaces all three fees at once. The first call creates the row.
    pub async fn update_tariff(&self, values: TariffValues) -> EngineResult<Tariff> {
        validate_tariff(&values)?;

        let tariff = Tariff {
            id: TARIFF_KEY.to_string(),
            daily_rental_fee: values.daily_rental_fee,
            daily_late_fee: values.daily_late_fee,
            repair_fee: values.repair_fee,
            updated_at: self.clock.now(),
        };

        let mut tx = self.db.begin().await?;
        TariffRepository::upsert(&mut tx, &tariff).await?;
        tx.commit().await?;

        info!(
            rental = %tariff.daily_rental_fee,
            late = %tariff.daily_late_fee,
            repair = %tariff.repair_fee,
            "Tariff updated"
        );
        Ok(tariff)
    }
}

/// Reads the tariff on an already-open connection or transaction.
pub(crate) async fn current(conn: &mut SqliteConnection) -> EngineResult<Tariff> {
    let tariff = TariffRepository::get(conn)
        .await?
        .ok_or(CoreError::TariffNotConfigured)?;
    debug!(rental = %tariff.daily_rental_fee, "Tariff loaded");
    Ok(tariff)
}
