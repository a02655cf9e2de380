//! # Audit Trail
//!
//! The kardex: one immutable entry per inventory-affecting operation.
//!
//! ## Who Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InventoryLedger mutator ──► AuditTrail::record(conn, ..)  (same tx)   │
//! │                                                                         │
//! │  Admin / import tooling ───► AuditTrail::register_movement (own tx)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Ledger mutators never commit the kardex separately: if the stock update
//! rolls back, so does its movement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use toolshed_core::inventory::StockMovement;
use toolshed_core::{Clock, KardexEntry, MovementType, ValidationError};
use toolshed_db::{Database, KardexRepository};

use crate::error::EngineResult;
use crate::inventory::require_tool;

#[derive(Clone)]
pub struct AuditTrail {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        AuditTrail { db, clock }
    }

    /// Appends a movement produced by a ledger transition, inside the
    /// caller's transaction.
    pub(crate) async fn record(
        &self,
        conn: &mut SqliteConnection,
        tool_id: &str,
        movement: StockMovement,
        user_id: &str,
    ) -> EngineResult<KardexEntry> {
        let entry = KardexEntry::record(
            tool_id,
            movement.movement_type,
            movement.quantity,
            user_id,
            self.clock.now(),
        );
        KardexRepository::append(conn, &entry).await?;
        Ok(entry)
    }

    /// Appends one movement on its own.
    ///
    /// No business validation beyond tool existence and a positive
    /// quantity; stock is not touched.
    ///
    /// ## Errors
    /// - `NotFound` if the tool id does not resolve
    /// - `Validation` if `quantity` ≤ 0
    pub async fn register_movement(
        &self,
        tool_id: &str,
        movement_type: MovementType,
        quantity: i64,
        user_id: &str,
    ) -> EngineResult<KardexEntry> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let mut tx = self.db.begin().await?;
        require_tool(&mut tx, tool_id).await?;
        let entry = KardexEntry::record(tool_id, movement_type, quantity, user_id, self.clock.now());
        KardexRepository::append(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(
            tool_id = %tool_id,
            movement = %movement_type,
            quantity,
            user_id = %user_id,
            "Movement registered"
        );
        Ok(entry)
    }

    /// Every movement of a tool, in recording order.
    pub async fn movements_by_tool(&self, tool_id: &str) -> EngineResult<Vec<KardexEntry>> {
        let mut conn = self.db.acquire().await?;
        require_tool(&mut conn, tool_id).await?;
        let entries = KardexRepository::list_by_tool(&mut conn, tool_id).await?;
        debug!(tool_id = %tool_id, count = entries.len(), "Kardex by tool");
        Ok(entries)
    }

    /// Movements recorded between two instants, both inclusive.
    pub async fn movements_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<KardexEntry>> {
        if start > end {
            return Err(ValidationError::DateOrder {
                earlier: "start".to_string(),
                later: "end".to_string(),
            }
            .into());
        }

        let mut conn = self.db.acquire().await?;
        Ok(KardexRepository::list_by_range(&mut conn, start, end).await?)
    }

    pub async fn movements_by_tool_and_type(
        &self,
        tool_id: &str,
        movement_type: MovementType,
    ) -> EngineResult<Vec<KardexEntry>> {
        let mut conn = self.db.acquire().await?;
        Ok(KardexRepository::list_by_tool_and_type(&mut conn, tool_id, movement_type).await?)
    }

    pub async fn all_movements(&self) -> EngineResult<Vec<KardexEntry>> {
        let mut conn = self.db.acquire().await?;
        Ok(KardexRepository::list_all(&mut conn).await?)
    }
}
