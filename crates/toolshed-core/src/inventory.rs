//! # Inventory Transitions
//!
//! Pure stock/status transitions of a [`Tool`]. Each transition mutates the
//! tool in place and returns the [`StockMovement`] the kardex must record.
//! Persisting both, in one transaction, is the engine's job.
//!
//! ## Transition Table
//! ```text
//! ┌──────────────────┬──────────────────────────┬──────────────────────────────┬──────────────┐
//! │ Transition       │ Precondition             │ Effect                       │ Kardex       │
//! ├──────────────────┼──────────────────────────┼──────────────────────────────┼──────────────┤
//! │ checkout         │ AVAILABLE ∧ stock > 0    │ stock-1; 0 ⇒ LOANED          │ LOAN 1       │
//! │ check_in         │ -                        │ stock+1; AVAILABLE unless    │ RETURN 1     │
//! │                  │                          │ REPAIRING / DECOMMISSIONED   │              │
//! │ send_to_repair   │ not REPAIRING/DECOMM.    │ REPAIRING; stock-1 (floor 0) │ REPAIR 1     │
//! │ finish_repair    │ REPAIRING                │ stock+1; AVAILABLE           │ INCOME 1     │
//! │ retire           │ -                        │ DECOMMISSIONED; stock 0      │ DECOMMISSION │
//! │                  │                          │                              │ max(stock,1) │
//! │ adjust           │ legal (sign, kind), not  │ stock+delta; status          │ kind |delta| │
//! │                  │ DECOMM., result ≥ 0      │ recomputed                   │              │
//! └──────────────────┴──────────────────────────┴──────────────────────────────┴──────────────┘
//! ```
//!
//! Failed transitions leave the tool untouched.

use crate::error::{CoreError, CoreResult};
use crate::types::{MovementType, Tool, ToolStatus};

// =============================================================================
// Stock Movement
// =============================================================================

/// The kardex line produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMovement {
    pub movement_type: MovementType,
    /// Always positive.
    pub quantity: i64,
}

impl StockMovement {
    const fn new(movement_type: MovementType, quantity: i64) -> Self {
        StockMovement {
            movement_type,
            quantity,
        }
    }
}

// =============================================================================
// Adjustment Table
// =============================================================================

/// Sign of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn of(delta: i64) -> Option<Direction> {
        match delta {
            d if d > 0 => Some(Direction::Increase),
            d if d < 0 => Some(Direction::Decrease),
            _ => None,
        }
    }
}

/// Every legal (sign, movement type) pair for a manual adjustment.
/// Loan, return, repair and decommission movements only come from their
/// own transitions.
pub const ADJUSTMENT_KINDS: &[(Direction, MovementType)] = &[
    (Direction::Increase, MovementType::Income),
    (Direction::Decrease, MovementType::ManualDecrease),
];

/// Checks `(sign(delta), kind)` against [`ADJUSTMENT_KINDS`].
pub fn is_legal_adjustment(delta: i64, kind: MovementType) -> bool {
    match Direction::of(delta) {
        Some(direction) => ADJUSTMENT_KINDS.contains(&(direction, kind)),
        None => false,
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// Takes one unit out for a loan.
pub fn checkout(tool: &mut Tool) -> CoreResult<StockMovement> {
    if tool.status != ToolStatus::Available || tool.stock <= 0 {
        return Err(CoreError::ToolUnavailable {
            tool_id: tool.id.clone(),
            status: tool.status,
            stock: tool.stock,
        });
    }

    tool.stock -= 1;
    if tool.stock == 0 {
        tool.status = ToolStatus::Loaned;
    }

    Ok(StockMovement::new(MovementType::Loan, 1))
}

/// Puts a returned, undamaged unit back on the shelf.
///
/// A decommissioned tool absorbs the unit: stock stays at zero, but the
/// return is still recorded.
pub fn check_in(tool: &mut Tool) -> StockMovement {
    match tool.status {
        ToolStatus::Decommissioned => {}
        ToolStatus::Repairing => tool.stock += 1,
        ToolStatus::Available | ToolStatus::Loaned => {
            tool.stock += 1;
            tool.status = ToolStatus::Available;
        }
    }

    StockMovement::new(MovementType::Return, 1)
}

/// Sends a unit to the workshop.
pub fn send_to_repair(tool: &mut Tool) -> CoreResult<StockMovement> {
    match tool.status {
        ToolStatus::Decommissioned => Err(CoreError::ToolDecommissioned {
            tool_id: tool.id.clone(),
        }),
        ToolStatus::Repairing => Err(CoreError::AlreadyInRepair {
            tool_id: tool.id.clone(),
        }),
        ToolStatus::Available | ToolStatus::Loaned => {
            tool.status = ToolStatus::Repairing;
            tool.stock = (tool.stock - 1).max(0);
            Ok(StockMovement::new(MovementType::Repair, 1))
        }
    }
}

/// Brings the repaired unit back into stock.
pub fn finish_repair(tool: &mut Tool) -> CoreResult<StockMovement> {
    if tool.status != ToolStatus::Repairing {
        return Err(CoreError::NotInRepair {
            tool_id: tool.id.clone(),
            status: tool.status,
        });
    }

    tool.stock += 1;
    tool.status = ToolStatus::Available;
    Ok(StockMovement::new(MovementType::Income, 1))
}

/// Retires the tool. Logs the units written off, or 1 when the shelf was
/// already empty (the unit being retired).
pub fn retire(tool: &mut Tool) -> StockMovement {
    let quantity = if tool.stock > 0 { tool.stock } else { 1 };
    tool.status = ToolStatus::Decommissioned;
    tool.stock = 0;
    StockMovement::new(MovementType::Decommission, quantity)
}

/// Fails unless the tool may be retired through the admin entry point.
pub fn ensure_decommissionable(tool: &Tool) -> CoreResult<()> {
    match tool.status {
        ToolStatus::Loaned | ToolStatus::Repairing => Err(CoreError::ToolInUse {
            tool_id: tool.id.clone(),
            status: tool.status,
        }),
        ToolStatus::Decommissioned => Err(CoreError::ToolDecommissioned {
            tool_id: tool.id.clone(),
        }),
        ToolStatus::Available => Ok(()),
    }
}

/// Applies a manual stock adjustment.
pub fn adjust(tool: &mut Tool, delta: i64, kind: MovementType) -> CoreResult<StockMovement> {
    let reject = |reason: String| CoreError::InvalidAdjustment {
        tool_id: tool.id.clone(),
        reason,
    };

    if delta == 0 {
        return Err(reject("delta must not be zero".to_string()));
    }
    if !is_legal_adjustment(delta, kind) {
        return Err(reject(format!(
            "{} cannot be used for a delta of {}",
            kind, delta
        )));
    }
    if tool.status == ToolStatus::Decommissioned {
        return Err(CoreError::ToolDecommissioned {
            tool_id: tool.id.clone(),
        });
    }

    let stock = tool
        .stock
        .checked_add(delta)
        .ok_or_else(|| reject(format!("delta {} overflows stock {}", delta, tool.stock)))?;
    if stock < 0 {
        return Err(reject(format!(
            "stock would become {} (current {})",
            stock, tool.stock
        )));
    }

    tool.stock = stock;
    tool.status = match (stock > 0, tool.status) {
        (_, ToolStatus::Repairing) => ToolStatus::Repairing,
        (true, _) => ToolStatus::Available,
        (false, _) => ToolStatus::Loaned,
    };

    Ok(StockMovement::new(kind, delta.abs()))
}

// =============================================================================
// Unit Tests
// =============================================================================
