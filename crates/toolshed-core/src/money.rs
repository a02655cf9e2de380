//! # Money Module
//!
//! Provides the `Money` type for tariffs, replacement values and loan charges.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount in the back office is a whole currency unit (pesos).      │
//! │                                                                         │
//! │    Tariff.daily_rental_fee ──┐                                          │
//! │    Tariff.daily_late_fee ────┼──► billing::price_return ──► total       │
//! │    Tariff.repair_fee ────────┤         (days × rate, no division)       │
//! │    Tool.replacement_value ───┘                                          │
//! │                                                                         │
//! │  Pricing only multiplies by whole days and adds, so i64 is exact as     │
//! │  long as it fits. The checked forms report overflow as `None`.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use toolshed_core::money::Money;
//!
//! let daily = Money::new(1000);
//! assert_eq!(daily.checked_times(5), Some(Money::new(5000)));
//! assert_eq!(Money::new(i64::MAX).checked_add(daily), None);
//! assert_eq!((daily + Money::new(500)).to_string(), "$1.500");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in whole currency units.
///
/// Signed so that accidental subtraction shows up as a negative value
/// instead of wrapping; validated writes only ever store values ≥ 0.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the amount in whole currency units.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies a per-day rate by a number of days, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use toolshed_core::money::Money;
    ///
    /// let late_fee = Money::new(2000).checked_times(2);
    /// assert_eq!(late_fee, Some(Money::new(4000)));
    /// ```
    #[inline]
    pub const fn checked_times(&self, units: i64) -> Option<Self> {
        match self.0.checked_mul(units) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, rhs: Money) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

/// Formats with `.` thousands separators, e.g. `$50.000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        if self.0 < 0 {
            write!(f, "-${}", grouped)
        } else {
            write!(f, "${}", grouped)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
