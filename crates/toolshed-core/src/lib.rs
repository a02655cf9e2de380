//! # toolshed-core: Pure Business Logic for the Tool-Lending Back Office
//!
//! This crate holds every rule of the loan lifecycle and billing engine as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolshed Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP / auth layer (external)                       │   │
//! │  │    parses requests, resolves acting user, maps ErrorKind        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 toolshed-engine (services)                      │   │
//! │  │    LoanEngine, InventoryLedger, ClientRegistry, Reporting       │   │
//! │  │    one SQLite transaction per operation                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ toolshed-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │ billing  │ │inventory │ │ lending          │  │   │
//! │  │   │  money   │ │ pricing  │ │ stock &  │ │ eligibility,     │  │   │
//! │  │   │  clock   │ │ of return│ │ status   │ │ reactivation     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                toolshed-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Tool, Client, Loan, KardexEntry, Tariff)
//! - [`money`] - Integer money in whole currency units
//! - [`error`] - Domain error types and [`ErrorKind`]
//! - [`validation`] - Input validation (RUT, contact data, amounts)
//! - [`clock`] - Injected time source
//! - [`inventory`] - Stock and status transitions of a tool
//! - [`billing`] - Pricing of a return
//! - [`lending`] - Loan eligibility and client reactivation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use toolshed_core::billing::{price_return, ReturnCondition};
//! use toolshed_core::{Money, TariffValues};
//!
//! let tariff = TariffValues {
//!     daily_rental_fee: Money::new(1000),
//!     daily_late_fee: Money::new(2000),
//!     repair_fee: Money::new(5000),
//! };
//! let start = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
//! let due = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
//!
//! // Same-day return of a repairable tool: one billed day plus repair fee
//! let charge =
//!     price_return(&tariff, start, due, start, Money::new(60000), ReturnCondition::Repairable)
//!         .unwrap();
//! assert_eq!(charge.total, Money::new(6000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod clock;
pub mod error;
pub mod inventory;
pub mod lending;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of open (ACTIVE or LATE) loans per client.
pub const MAX_ACTIVE_LOANS: i64 = 5;

/// Fixed key of the singleton tariff row.
pub const TARIFF_KEY: &str = "active";

/// Acting-user id recorded for movements made by maintenance tooling
/// (seeding, scheduled jobs) rather than a signed-in person.
pub const SYSTEM_USER: &str = "system";
