//! # Reporting
//!
//! Read-only views for the front desk. Date windows filter on the loan's
//! start date, both ends inclusive; leaving either end out means all time.

use chrono::NaiveDate;
use tracing::debug;

use toolshed_core::{Client, ClientStatus, DateRange, Loan, LoanStatus, ToolLoanCount, ValidationError};
use toolshed_db::{ClientRepository, Database, LoanRepository, ReportRepository};

use crate::error::EngineResult;

/// Builds the optional window. Only a fully specified pair filters.
///
/// ## Errors
/// `Validation` if both ends are given and `start` is after `end`.
pub fn range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> EngineResult<Option<DateRange>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end)?)),
        _ => Ok(None),
    }
}

#[derive(Clone)]
pub struct Reporting {
    db: Database,
}

impl Reporting {
    pub fn new(db: Database) -> Self {
        Reporting { db }
    }

    /// ACTIVE and LATE loans, earliest due date first.
    pub async fn active_loans(&self, window: Option<DateRange>) -> EngineResult<Vec<Loan>> {
        let mut conn = self.db.acquire().await?;
        let loans = ReportRepository::open_loans(&mut conn, window).await?;
        debug!(count = loans.len(), "Open loans report");
        Ok(loans)
    }

    /// Each client with a LATE loan, once.
    pub async fn clients_with_late_loans(
        &self,
        window: Option<DateRange>,
    ) -> EngineResult<Vec<Client>> {
        let mut conn = self.db.acquire().await?;
        Ok(ReportRepository::late_clients(&mut conn, window).await?)
    }

    /// Tools ranked by loan count, descending.
    pub async fn most_borrowed_tools(
        &self,
        window: Option<DateRange>,
        limit: i64,
    ) -> EngineResult<Vec<ToolLoanCount>> {
        if limit <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "limit".to_string(),
            }
            .into());
        }

        let mut conn = self.db.acquire().await?;
        Ok(ReportRepository::most_borrowed_tools(&mut conn, window, limit).await?)
    }

    /// Loans in one status, given by name (`active`, `late`, `closed`).
    pub async fn loans_by_status(&self, status: &str) -> EngineResult<Vec<Loan>> {
        let status: LoanStatus = status.parse()?;
        let mut conn = self.db.acquire().await?;
        Ok(LoanRepository::list_by_status(&mut conn, status).await?)
    }

    pub async fn restricted_clients(&self) -> EngineResult<Vec<Client>> {
        let mut conn = self.db.acquire().await?;
        Ok(ClientRepository::list_by_status(&mut conn, ClientStatus::Restricted).await?)
    }
}
