//! # Repositories
//!
//! One unit struct per table. Every method takes `&mut SqliteConnection`, so
//! the same call works on a pooled connection for reads and inside a
//! transaction for writes:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! let tool = ToolRepository::get_by_id(&mut tx, &tool_id).await?;
//! KardexRepository::append(&mut tx, &entry).await?;
//! tx.commit().await?;
//! ```

mod client;
mod kardex;
mod loan;
mod report;
mod tariff;
mod tool;

pub use client::ClientRepository;
pub use kardex::KardexRepository;
pub use loan::LoanRepository;
pub use report::ReportRepository;
pub use tariff::TariffRepository;
pub use tool::ToolRepository;
