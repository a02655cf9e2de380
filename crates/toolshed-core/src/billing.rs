//! # Billing
//!
//! Prices a loan return.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  rental_days = max(1, return_date - start_date)                        │
//! │  late_days   = max(0, return_date - due_date)                          │
//! │                                                                         │
//! │  rental   = rental_days × tariff.daily_rental_fee                      │
//! │  late_fee = late_days   × tariff.daily_late_fee                        │
//! │  damage   = Intact      → 0                                            │
//! │             Repairable  → tariff.repair_fee                            │
//! │             Irreparable → tool.replacement_value                       │
//! │                                                                         │
//! │  total    = rental + late_fee + damage                                 │
//! │  (any product or sum that overflows i64 → ChargeOverflow)              │
//! │                                                                         │
//! │  Example: start = D-5, due = D-2, returned D, intact, 1000/2000        │
//! │           → 5 × 1000 + 2 × 2000 + 0 = 9000                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TariffValues;

/// At least one day is always billed, even for same-day returns.
pub const MIN_BILLABLE_DAYS: i64 = 1;

/// Condition of the unit at return. Decides the damage charge and which
/// inventory transition follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Intact,
    Repairable,
    Irreparable,
}

impl ReturnCondition {
    /// `irreparable` only counts when `damaged` is set.
    pub fn from_flags(damaged: bool, irreparable: bool) -> Self {
        match (damaged, irreparable) {
            (false, _) => ReturnCondition::Intact,
            (true, false) => ReturnCondition::Repairable,
            (true, true) => ReturnCondition::Irreparable,
        }
    }
}

/// Itemised charge for one return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChargeBreakdown {
    pub rental_days: i64,
    pub late_days: i64,
    pub rental: Money,
    pub late_fee: Money,
    pub damage: Money,
    pub total: Money,
}

/// Billable rental days between start and return.
pub fn rental_days(start_date: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - start_date).num_days().max(MIN_BILLABLE_DAYS)
}

/// Days past the due date, zero when on time.
pub fn late_days(due_date: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - due_date).num_days().max(0)
}

/// Computes the full charge for a return.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use toolshed_core::billing::{price_return, ReturnCondition};
/// use toolshed_core::{Money, TariffValues};
///
/// let tariff = TariffValues {
///     daily_rental_fee: Money::new(1000),
///     daily_late_fee: Money::new(2000),
///     repair_fee: Money::new(5000),
/// };
/// let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
///
/// let charge = price_return(
///     &tariff, d(1), d(4), d(6), Money::new(50000), ReturnCondition::Intact,
/// )
/// .unwrap();
/// assert_eq!(charge.total, Money::new(9000));
/// ```
pub fn price_return(
    tariff: &TariffValues,
    start_date: NaiveDate,
    due_date: NaiveDate,
    return_date: NaiveDate,
    replacement_value: Money,
    condition: ReturnCondition,
) -> CoreResult<ChargeBreakdown> {
    let overflow = |component| CoreError::ChargeOverflow { component };

    let rental_days = rental_days(start_date, return_date);
    let late_days = late_days(due_date, return_date);

    let rental = tariff
        .daily_rental_fee
        .checked_times(rental_days)
        .ok_or_else(|| overflow("rental"))?;
    let late_fee = tariff
        .daily_late_fee
        .checked_times(late_days)
        .ok_or_else(|| overflow("late fee"))?;
    let damage = match condition {
        ReturnCondition::Intact => Money::zero(),
        ReturnCondition::Repairable => tariff.repair_fee,
        ReturnCondition::Irreparable => replacement_value,
    };

    let total = rental
        .checked_add(late_fee)
        .and_then(|subtotal| subtotal.checked_add(damage))
        .ok_or_else(|| overflow("total"))?;

    Ok(ChargeBreakdown {
        rental_days,
        late_days,
        rental,
        late_fee,
        damage,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
