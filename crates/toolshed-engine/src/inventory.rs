//! # Inventory Ledger
//!
//! Owns tool stock and status. Every change goes through one of the
//! mutators below, which persist the tool and append exactly one kardex
//! entry in the caller's transaction.
//!
//! ## Mutator Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  mutator(conn, tool, user)                                              │
//! │     │                                                                   │
//! │     ├── 1. core transition (toolshed_core::inventory)                  │
//! │     │        precondition failed → CoreError, nothing written          │
//! │     │                                                                   │
//! │     ├── 2. ToolRepository::update  (version-checked → Conflict)        │
//! │     │                                                                   │
//! │     └── 3. AuditTrail::record      (one kardex entry)                  │
//! │                                                                         │
//! │  The caller commits. Admin entry points (create_tool, send_to_repair,  │
//! │  ...) open and commit their own transaction around one mutator.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use toolshed_core::inventory::{self, StockMovement};
use toolshed_core::validation::{validate_new_tool, validate_tool_details};
use toolshed_core::{Clock, CoreError, MovementType, NewTool, Tool, ToolDetails};
use toolshed_db::{Database, ToolRepository};

use crate::error::EngineResult;
use crate::kardex::AuditTrail;

/// Loads a tool or fails with `NotFound`.
pub(crate) async fn require_tool(conn: &mut SqliteConnection, tool_id: &str) -> EngineResult<Tool> {
    ToolRepository::get_by_id(conn, tool_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Tool", tool_id).into())
}

#[derive(Clone)]
pub struct InventoryLedger {
    db: Database,
    clock: Arc<dyn Clock>,
    audit: AuditTrail,
}

impl InventoryLedger {
    pub fn new(db: Database, clock: Arc<dyn Clock>, audit: AuditTrail) -> Self {
        InventoryLedger { db, clock, audit }
    }

    // =========================================================================
    // Mutators (caller's transaction)
    // =========================================================================

    /// Takes one unit out for a loan; the last unit flips the tool to LOANED.
    pub async fn decrement_for_loan(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let movement = inventory::checkout(&mut tool)?;
        self.persist(conn, tool, movement, user_id).await
    }

    /// Puts an intact unit back on the shelf.
    pub async fn increment_for_return(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let movement = inventory::check_in(&mut tool);
        self.persist(conn, tool, movement, user_id).await
    }

    /// Sends a unit to the workshop.
    pub async fn mark_repairing(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let movement = inventory::send_to_repair(&mut tool)?;
        self.persist(conn, tool, movement, user_id).await
    }

    /// Retires the tool for good.
    pub async fn mark_decommissioned(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let movement = inventory::retire(&mut tool);
        self.persist(conn, tool, movement, user_id).await
    }

    /// Applies a manual correction. `kind` must agree with the sign of
    /// `delta`: INCOME adds, MANUAL_DECREASE removes.
    pub async fn apply_adjustment(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        delta: i64,
        kind: MovementType,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let movement = inventory::adjust(&mut tool, delta, kind)?;
        self.persist(conn, tool, movement, user_id).await
    }

    async fn persist(
        &self,
        conn: &mut SqliteConnection,
        mut tool: Tool,
        movement: StockMovement,
        user_id: &str,
    ) -> EngineResult<Tool> {
        tool.updated_at = self.clock.now();
        let saved = ToolRepository::update(conn, &tool).await?;
        self.audit.record(conn, &saved.id, movement, user_id).await?;

        debug!(
            tool_id = %saved.id,
            movement = %movement.movement_type,
            quantity = movement.quantity,
            stock = saved.stock,
            status = %saved.status,
            "Inventory movement applied"
        );
        Ok(saved)
    }

    // =========================================================================
    // Entry Points (own transaction)
    // =========================================================================

    /// Registers a tool. Initial stock, if any, is logged as one INCOME.
    pub async fn create_tool(&self, input: NewTool, user_id: &str) -> EngineResult<Tool> {
        validate_new_tool(&input)?;

        let tool = Tool::register(input, self.clock.now());

        let mut tx = self.db.begin().await?;
        ToolRepository::insert(&mut tx, &tool).await?;
        if tool.stock > 0 {
            self.audit
                .record(
                    &mut tx,
                    &tool.id,
                    StockMovement {
                        movement_type: MovementType::Income,
                        quantity: tool.stock,
                    },
                    user_id,
                )
                .await?;
        }
        tx.commit().await?;

        info!(
            tool_id = %tool.id,
            name = %tool.name,
            stock = tool.stock,
            user_id = %user_id,
            "Tool created"
        );
        Ok(tool)
    }

    /// Changes name, category and replacement value. Stock and status are
    /// untouched and nothing is logged to the kardex.
    pub async fn update_tool(&self, tool_id: &str, details: ToolDetails) -> EngineResult<Tool> {
        validate_tool_details(&details)?;

        let mut tx = self.db.begin().await?;
        let mut tool = require_tool(&mut tx, tool_id).await?;
        tool.name = details.name.trim().to_string();
        tool.category = details.category.trim().to_string();
        tool.replacement_value = details.replacement_value;
        tool.updated_at = self.clock.now();
        let saved = ToolRepository::update(&mut tx, &tool).await?;
        tx.commit().await?;

        info!(tool_id = %saved.id, name = %saved.name, "Tool details updated");
        Ok(saved)
    }

    /// Retires an AVAILABLE tool.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `InvalidOperation` while units are out (LOANED), in the workshop
    ///   (REPAIRING), or if the tool is already retired
    pub async fn decommission_tool(&self, tool_id: &str, user_id: &str) -> EngineResult<Tool> {
        let mut tx = self.db.begin().await?;
        let tool = require_tool(&mut tx, tool_id).await?;
        if let Err(e) = inventory::ensure_decommissionable(&tool) {
            warn!(tool_id = %tool_id, status = %tool.status, "Decommission refused");
            return Err(e.into());
        }
        let saved = self.mark_decommissioned(&mut tx, tool, user_id).await?;
        tx.commit().await?;

        info!(tool_id = %saved.id, user_id = %user_id, "Tool decommissioned");
        Ok(saved)
    }

    /// Sends one unit of a tool to the workshop outside of a return.
    pub async fn send_to_repair(&self, tool_id: &str, user_id: &str) -> EngineResult<Tool> {
        let mut tx = self.db.begin().await?;
        let tool = require_tool(&mut tx, tool_id).await?;
        let saved = self.mark_repairing(&mut tx, tool, user_id).await?;
        tx.commit().await?;

        info!(tool_id = %saved.id, stock = saved.stock, "Tool sent to repair");
        Ok(saved)
    }

    /// Brings the repaired unit back: stock + 1, AVAILABLE, one INCOME.
    pub async fn complete_repair(&self, tool_id: &str, user_id: &str) -> EngineResult<Tool> {
        let mut tx = self.db.begin().await?;
        let mut tool = require_tool(&mut tx, tool_id).await?;
        let movement = inventory::finish_repair(&mut tool)?;
        let saved = self.persist(&mut tx, tool, movement, user_id).await?;
        tx.commit().await?;

        info!(tool_id = %saved.id, stock = saved.stock, "Repair completed");
        Ok(saved)
    }

    /// Manual stock correction in its own transaction.
    pub async fn adjust_stock(
        &self,
        tool_id: &str,
        delta: i64,
        kind: MovementType,
        user_id: &str,
    ) -> EngineResult<Tool> {
        let mut tx = self.db.begin().await?;
        let tool = require_tool(&mut tx, tool_id).await?;
        let saved = self
            .apply_adjustment(&mut tx, tool, delta, kind, user_id)
            .await?;
        tx.commit().await?;

        info!(
            tool_id = %saved.id,
            delta,
            movement = %kind,
            stock = saved.stock,
            "Stock adjusted"
        );
        Ok(saved)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_tool(&self, tool_id: &str) -> EngineResult<Tool> {
        let mut conn = self.db.acquire().await?;
        require_tool(&mut conn, tool_id).await
    }

    /// All tools ordered by name, retired ones included.
    pub async fn list_tools(&self) -> EngineResult<Vec<Tool>> {
        let mut conn = self.db.acquire().await?;
        Ok(ToolRepository::list(&mut conn).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
