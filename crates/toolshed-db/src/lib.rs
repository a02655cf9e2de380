//! # toolshed-db: Database Layer for the Tool-Lending Back Office
//!
//! SQLite storage for clients, tools, loans, the kardex and the tariff,
//! accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolshed Data Flow                               │
//! │                                                                         │
//! │  toolshed-engine (LoanEngine::create_loan)                             │
//! │       │  db.begin()                                                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    toolshed-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ToolRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ClientRepo    │    │ 001_initial_ │  │   │
//! │  │   │ Transactions  │    │ LoanRepo      │    │   schema.sql │  │   │
//! │  │   │               │    │ KardexRepo    │    │              │  │   │
//! │  │   │               │    │ TariffRepo    │    │              │  │   │
//! │  │   │               │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table, plus report queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolshed_db::{Database, DbConfig, ToolRepository};
//!
//! let db = Database::new(DbConfig::new("toolshed.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let tool = ToolRepository::get_by_id(&mut tx, &tool_id).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    ClientRepository, KardexRepository, LoanRepository, ReportRepository, TariffRepository,
    ToolRepository,
};
