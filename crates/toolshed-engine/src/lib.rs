//! # toolshed-engine: Back-Office Services for Toolshed
//!
//! This crate turns the pure rules of `toolshed-core` into transactional
//! operations over `toolshed-db`. Each public operation opens one SQLite
//! transaction, runs every check, writes, and commits, or rolls back as a
//! whole.
//!
//! ## Service Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             BackOffice                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         LoanEngine                               │  │
//! │  │   create_loan • return_loan • mark_loan_as_paid                  │  │
//! │  │   attempt_client_reactivation • mark_overdue                     │  │
//! │  └───────────┬──────────────────────┬───────────────────┬───────────┘  │
//! │              │                      │                   │              │
//! │              ▼                      ▼                   ▼              │
//! │  ┌──────────────────────┐ ┌──────────────────┐ ┌──────────────────┐    │
//! │  │   InventoryLedger    │ │  ClientRegistry  │ │  TariffProvider  │    │
//! │  │ stock + tool status  │ │ standing, RUT    │ │ singleton fees   │    │
//! │  └──────────┬───────────┘ └──────────────────┘ └──────────────────┘    │
//! │             │ same transaction                                         │
//! │             ▼                                                          │
//! │  ┌──────────────────────┐                    ┌──────────────────┐      │
//! │  │     AuditTrail       │                    │    Reporting     │      │
//! │  │  append-only kardex  │                    │  read-only views │      │
//! │  └──────────────────────┘                    └──────────────────┘      │
//! │                                                                         │
//! │  Clock: injected, shared by every service                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`loans`] - Loan lifecycle and client reactivation
//! - [`inventory`] - Tool registration, stock and status transitions
//! - [`kardex`] - Movement log writes and queries
//! - [`clients`] - Client registration and standing
//! - [`tariff`] - The active fee schedule
//! - [`reports`] - Open loans, late clients, most-borrowed tools
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - `tracing` subscriber setup
//! - [`error`] - [`EngineError`] and its mapping onto `ErrorKind`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolshed_engine::{BackOffice, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! toolshed_engine::telemetry::init_tracing(&config.logging.filter);
//! let office = BackOffice::open(&config).await?;
//!
//! let loan = office.loans.create_loan(request, "clerk-7").await?;
//! ```

use std::sync::Arc;

use toolshed_core::{Clock, SystemClock};
use toolshed_db::Database;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clients;
pub mod config;
pub mod error;
pub mod inventory;
pub mod kardex;
pub mod loans;
pub mod reports;
pub mod tariff;
pub mod telemetry;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clients::ClientRegistry;
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use inventory::InventoryLedger;
pub use kardex::AuditTrail;
pub use loans::LoanEngine;
pub use reports::Reporting;
pub use tariff::TariffProvider;

// =============================================================================
// Back Office
// =============================================================================

/// Every service, wired to one database and one clock.
#[derive(Clone)]
pub struct BackOffice {
    pub tariffs: TariffProvider,
    pub inventory: InventoryLedger,
    pub kardex: AuditTrail,
    pub clients: ClientRegistry,
    pub loans: LoanEngine,
    pub reports: Reporting,
    pub clock: Arc<dyn Clock>,
}

impl BackOffice {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        let kardex = AuditTrail::new(db.clone(), clock.clone());
        let inventory = InventoryLedger::new(db.clone(), clock.clone(), kardex.clone());
        let clients = ClientRegistry::new(db.clone(), clock.clone());
        let loans = LoanEngine::new(db.clone(), clock.clone(), inventory.clone(), clients.clone());

        BackOffice {
            tariffs: TariffProvider::new(db.clone(), clock.clone()),
            inventory,
            kardex,
            clients,
            loans,
            reports: Reporting::new(db),
            clock,
        }
    }

    /// Connects (and migrates) the configured database on the wall clock.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(BackOffice::new(db, Arc::new(SystemClock)))
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
