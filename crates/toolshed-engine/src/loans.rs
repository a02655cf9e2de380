//! # Loan Engine
//!
//! The loan lifecycle: opening, returning, paying off, and the
//! reactivation rule for restricted clients.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_loan ──► ACTIVE ──────────────────────► CLOSED                │
//! │                     │                    return    ▲   total > 0       │
//! │                     │ mark_overdue               │   ⇒ client         │
//! │                     ▼ (external scheduler)       │     RESTRICTED     │
//! │                   LATE ──────────────────────────┘                     │
//! │                                          return                         │
//! │                                                                         │
//! │   mark_loan_as_paid:            total_charge := 0, status unchanged     │
//! │   attempt_client_reactivation:  RESTRICTED ─► ACTIVE when nothing is   │
//! │                                 late and nothing is owed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! Every operation is a single transaction. All rule checks run before the
//! first write; once writing starts, any failure (including losing a
//! version race) drops the transaction and rolls everything back, kardex
//! entries included.
//!
//! ## Return Flow
//! ```text
//! loan ─► tool matches? ─► still open? ─► return date ≥ start?
//!     ─► tariff ─► price_return(..)
//!     ─► ledger:  Intact      → increment_for_return   (RETURN)
//!                 Repairable  → mark_repairing         (REPAIR)
//!                 Irreparable → mark_decommissioned    (DECOMMISSION)
//!     ─► close loan (guarded) ─► restrict client if total > 0 ─► commit
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use toolshed_core::billing::{self, ReturnCondition};
use toolshed_core::{
    lending, Client, ClientStatus, Clock, CoreError, Loan, LoanRequest, LoanStatus, Money,
    ReturnRequest,
};
use toolshed_db::{ClientRepository, Database, LoanRepository};

use crate::clients::{require_client, ClientRegistry};
use crate::error::EngineResult;
use crate::inventory::{require_tool, InventoryLedger};
use crate::tariff;

/// Loads a loan or fails with `NotFound`.
async fn require_loan(conn: &mut sqlx::SqliteConnection, loan_id: &str) -> EngineResult<Loan> {
    LoanRepository::get_by_id(conn, loan_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Loan", loan_id).into())
}

#[derive(Clone)]
pub struct LoanEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    ledger: InventoryLedger,
    clients: ClientRegistry,
}

impl LoanEngine {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        ledger: InventoryLedger,
        clients: ClientRegistry,
    ) -> Self {
        LoanEngine {
            db,
            clock,
            ledger,
            clients,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Opens a loan of one unit.
    ///
    /// ## Checks (first failure wins, nothing written)
    /// 1. client and tool exist ........................ `NotFound`
    /// 2. client not restricted ........................ `InvalidOperation`
    /// 3. tool AVAILABLE with stock .................... `InvalidOperation`
    /// 4. due date given, not before start ............. `Validation`
    /// 5. fewer than 5 open loans ...................... `InvalidOperation`
    /// 6. no open loan of the same tool ................ `InvalidOperation`
    ///
    /// ## Effects
    /// One LOAN kardex entry, tool stock − 1, the new ACTIVE loan.
    pub async fn create_loan(&self, request: LoanRequest, user_id: &str) -> EngineResult<Loan> {
        let result = self.open_loan(&request, user_id).await;

        match &result {
            Ok(loan) => info!(
                loan_id = %loan.id,
                client_id = %loan.client_id,
                tool_id = %loan.tool_id,
                due_date = %loan.due_date,
                user_id = %user_id,
                "Loan created"
            ),
            Err(e) => warn!(
                client_id = %request.client_id,
                tool_id = %request.tool_id,
                kind = %e.kind(),
                error = %e,
                "Loan rejected"
            ),
        }

        result
    }

    async fn open_loan(&self, request: &LoanRequest, user_id: &str) -> EngineResult<Loan> {
        let mut tx = self.db.begin().await?;

        let client = require_client(&mut tx, &request.client_id).await?;
        let tool = require_tool(&mut tx, &request.tool_id).await?;

        lending::ensure_client_may_borrow(&client)?;
        lending::ensure_tool_lendable(&tool)?;
        let (start_date, due_date) =
            lending::resolve_loan_window(request.start_date, request.due_date, self.clock.today())?;

        let open_loans = LoanRepository::count_open_for_client(&mut tx, &client.id).await?;
        lending::ensure_below_loan_limit(&client.id, open_loans)?;

        let duplicate = LoanRepository::has_open_loan_for_tool(&mut tx, &client.id, &tool.id).await?;
        lending::ensure_no_duplicate_loan(&client.id, &tool.id, duplicate)?;

        // Claim the client row so a concurrent loan for the same client
        // cannot slip under the ceiling
        ClientRepository::touch(&mut tx, &client).await?;

        let tool = self.ledger.decrement_for_loan(&mut tx, tool, user_id).await?;

        let loan = Loan::open(&client.id, &tool.id, start_date, due_date, self.clock.now());
        LoanRepository::insert(&mut tx, &loan).await?;

        tx.commit().await?;
        Ok(loan)
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Closes a loan, prices it and moves the unit according to its
    /// condition. A nonzero charge restricts the client.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown loan
    /// - `Validation` if `tool_id` is not the loan's tool, or the return
    ///   date precedes the start date
    /// - `InvalidOperation` if the loan is already closed, or the ledger
    ///   refuses the move (e.g. the tool is already in the workshop)
    /// - `NotConfigured` if no tariff exists
    pub async fn return_loan(
        &self,
        loan_id: &str,
        request: ReturnRequest,
        user_id: &str,
    ) -> EngineResult<Loan> {
        let result = self.close_loan(loan_id, &request, user_id).await;

        if let Err(e) = &result {
            warn!(
                loan_id = %loan_id,
                tool_id = %request.tool_id,
                kind = %e.kind(),
                error = %e,
                "Return rejected"
            );
        }

        result
    }

    async fn close_loan(
        &self,
        loan_id: &str,
        request: &ReturnRequest,
        user_id: &str,
    ) -> EngineResult<Loan> {
        let mut tx = self.db.begin().await?;

        let loan = require_loan(&mut tx, loan_id).await?;
        let return_date =
            lending::resolve_return(&loan, &request.tool_id, request.return_date, self.clock.today())?;

        let tariff = tariff::current(&mut tx).await?;
        let tool = require_tool(&mut tx, &loan.tool_id).await?;

        let condition = ReturnCondition::from_flags(request.damaged, request.irreparable);
        let charge = billing::price_return(
            &tariff.values(),
            loan.start_date,
            loan.due_date,
            return_date,
            tool.replacement_value,
            condition,
        )?;

        let tool = match condition {
            ReturnCondition::Intact => self.ledger.increment_for_return(&mut tx, tool, user_id).await?,
            ReturnCondition::Repairable => self.ledger.mark_repairing(&mut tx, tool, user_id).await?,
            ReturnCondition::Irreparable => {
                self.ledger.mark_decommissioned(&mut tx, tool, user_id).await?
            }
        };

        let mut closed = loan;
        closed.return_date = Some(return_date);
        closed.status = LoanStatus::Closed;
        closed.total_charge = charge.total;
        closed.updated_at = self.clock.now();

        if !LoanRepository::close(&mut tx, &closed).await? {
            // Another return closed it between our read and our write
            return Err(CoreError::LoanAlreadyClosed { loan_id: closed.id }.into());
        }

        let client = require_client(&mut tx, &closed.client_id).await?;
        let restricted = if charge.total.is_positive() && !client.is_restricted() {
            self.clients
                .set_status(&mut tx, client, ClientStatus::Restricted)
                .await?;
            true
        } else {
            false
        };

        tx.commit().await?;

        info!(
            loan_id = %closed.id,
            client_id = %closed.client_id,
            tool_id = %tool.id,
            condition = ?condition,
            rental_days = charge.rental_days,
            late_days = charge.late_days,
            rental = %charge.rental,
            late_fee = %charge.late_fee,
            damage = %charge.damage,
            total = %charge.total,
            tool_status = %tool.status,
            "Loan returned"
        );
        if restricted {
            info!(client_id = %closed.client_id, total = %charge.total, "Client restricted");
        }

        Ok(closed)
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Clears the debt on a loan. The status is not changed and the client
    /// is not reactivated.
    pub async fn mark_loan_as_paid(&self, loan_id: &str) -> EngineResult<Loan> {
        let mut tx = self.db.begin().await?;
        let mut loan = require_loan(&mut tx, loan_id).await?;
        let previous = loan.total_charge;

        loan.total_charge = Money::zero();
        loan.updated_at = self.clock.now();
        LoanRepository::set_total_charge(&mut tx, &loan.id, loan.total_charge, loan.updated_at)
            .await?;
        tx.commit().await?;

        info!(loan_id = %loan.id, cleared = %previous, "Loan marked as paid");
        Ok(loan)
    }

    /// Returns a restricted client to ACTIVE if nothing is late and nothing
    /// is owed. Already-active clients are returned unchanged.
    ///
    /// ## Errors
    /// `InvalidOperation` while the client has a LATE loan or a CLOSED loan
    /// with a nonzero charge.
    pub async fn attempt_client_reactivation(&self, client_id: &str) -> EngineResult<Client> {
        let mut tx = self.db.begin().await?;
        let client = require_client(&mut tx, client_id).await?;

        if client.status == ClientStatus::Active {
            debug!(client_id = %client_id, "Client already active");
            return Ok(client);
        }

        let late = LoanRepository::count_late_for_client(&mut tx, client_id).await?;
        let unpaid = LoanRepository::count_unpaid_closed_for_client(&mut tx, client_id).await?;
        if let Err(e) = lending::ensure_reactivatable(client_id, late, unpaid) {
            warn!(client_id = %client_id, late, unpaid, "Reactivation refused");
            return Err(e.into());
        }

        let client = self
            .clients
            .set_status(&mut tx, client, ClientStatus::Active)
            .await?;
        tx.commit().await?;

        info!(client_id = %client.id, "Client reactivated");
        Ok(client)
    }

    // =========================================================================
    // Scheduler Hook
    // =========================================================================

    /// Moves ACTIVE loans due before `as_of` to LATE. Called by the
    /// external overdue job; no engine operation calls it.
    pub async fn mark_overdue(&self, as_of: NaiveDate) -> EngineResult<u64> {
        let mut tx = self.db.begin().await?;
        let changed = LoanRepository::mark_overdue(&mut tx, as_of, self.clock.now()).await?;
        tx.commit().await?;
        Ok(changed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_loan(&self, loan_id: &str) -> EngineResult<Loan> {
        let mut conn = self.db.acquire().await?;
        require_loan(&mut conn, loan_id).await
    }

    /// Every loan, newest first.
    pub async fn list_loans(&self) -> EngineResult<Vec<Loan>> {
        let mut conn = self.db.acquire().await?;
        Ok(LoanRepository::list(&mut conn).await?)
    }

    pub async fn loans_for_client(&self, client_id: &str) -> EngineResult<Vec<Loan>> {
        let mut conn = self.db.acquire().await?;
        require_client(&mut conn, client_id).await?;
        Ok(LoanRepository::list_by_client(&mut conn, client_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{back_office, date, new_client, today, BackOfficeFixture};
    use chrono::Duration;
    use toolshed_core::{ErrorKind, MovementType, ToolStatus};

    fn loan_for(client: &Client, tool_id: &str, start: Option<NaiveDate>, due: NaiveDate) -> LoanRequest {
        LoanRequest {
            client_id: client.id.clone(),
            tool_id: tool_id.to_string(),
            start_date: start,
            due_date: Some(due),
        }
    }

    fn intact(tool_id: &str) -> ReturnRequest {
        ReturnRequest {
            tool_id: tool_id.to_string(),
            damaged: false,
            irreparable: false,
            return_date: None,
        }
    }

    async fn fixture() -> BackOfficeFixture {
        BackOfficeFixture::new(back_office().await).await
    }

    // -------------------------------------------------------------------------
    // Scenario A: loan of the last unit
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_loan_of_last_unit() {
        let fx = fixture().await;
        let tool = fx.tool("Taladro", 1, 30000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today() + Duration::days(7)), "clerk")
            .await
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.start_date, today());
        assert!(loan.total_charge.is_zero());

        let tool = fx.office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.stock, 0);
        assert_eq!(tool.status, ToolStatus::Loaned);

        let loans = fx
            .office
            .kardex
            .movements_by_tool_and_type(&tool.id, MovementType::Loan)
            .await
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].user_id, "clerk");
    }

    // -------------------------------------------------------------------------
    // Scenario B: sixth concurrent loan
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sixth_open_loan_rejected() {
        let fx = fixture().await;
        let due = today() + Duration::days(3);

        for i in 0..5 {
            let tool = fx.tool(&format!("Herramienta {i}"), 2, 10000).await;
            fx.office
                .loans
                .create_loan(loan_for(&fx.client, &tool.id, None, due), "clerk")
                .await
                .unwrap();
        }

        let sixth = fx.tool("Herramienta 5", 2, 10000).await;
        let before = fx.office.kardex.all_movements().await.unwrap().len();

        let err = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &sixth.id, None, due), "clerk")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::LoanLimitReached { max: 5, .. })
        ));

        // No state change
        let sixth = fx.office.inventory.get_tool(&sixth.id).await.unwrap();
        assert_eq!(sixth.stock, 2);
        assert_eq!(fx.office.kardex.all_movements().await.unwrap().len(), before);
        assert_eq!(
            fx.office.loans.loans_for_client(&fx.client.id).await.unwrap().len(),
            5
        );
    }

    #[tokio::test]
    async fn test_late_loans_count_towards_limit() {
        let fx = fixture().await;

        for i in 0..5 {
            let tool = fx.tool(&format!("Atrasada {i}"), 1, 10000).await;
            fx.office
                .loans
                .create_loan(
                    loan_for(&fx.client, &tool.id, Some(date(2025, 3, 1)), date(2025, 3, 2)),
                    "clerk",
                )
                .await
                .unwrap();
        }
        assert_eq!(fx.office.loans.mark_overdue(today()).await.unwrap(), 5);

        let extra = fx.tool("Extra", 1, 10000).await;
        let err = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &extra.id, None, today()), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_duplicate_tool_loan_rejected() {
        let fx = fixture().await;
        let tool = fx.tool("Sierra", 3, 20000).await;
        let due = today() + Duration::days(2);

        fx.office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, due), "clerk")
            .await
            .unwrap();
        let err = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, due), "clerk")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::DuplicateActiveLoan { .. })
        ));
        assert_eq!(fx.office.inventory.get_tool(&tool.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_create_loan_check_order() {
        let fx = fixture().await;
        let tool = fx.tool("Lijadora", 1, 25000).await;
        let due = today() + Duration::days(2);

        let err = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, "missing", None, due), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Missing due date
        let mut request = loan_for(&fx.client, &tool.id, None, due);
        request.due_date = None;
        let err = fx.office.loans.create_loan(request, "clerk").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Due before start
        let err = fx
            .office
            .loans
            .create_loan(
                loan_for(&fx.client, &tool.id, Some(today()), today() - Duration::days(1)),
                "clerk",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Restriction is checked before the dates
        fx.office
            .clients
            .update_status(&fx.client.id, ClientStatus::Restricted)
            .await
            .unwrap();
        let mut request = loan_for(&fx.client, &tool.id, None, due);
        request.due_date = None;
        let err = fx.office.loans.create_loan(request, "clerk").await.unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::ClientRestricted { .. })
        ));

        assert_eq!(fx.office.inventory.get_tool(&tool.id).await.unwrap().stock, 1);
        assert!(fx.office.loans.list_loans().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_tool_rejected() {
        let fx = fixture().await;
        let tool = fx.tool("Andamio", 1, 80000).await;
        fx.office.inventory.send_to_repair(&tool.id, "admin").await.unwrap();

        let err = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::ToolUnavailable { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Scenario C: late undamaged return
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_late_return_is_priced_and_restricts() {
        let fx = fixture().await;
        let tool = fx.tool("Martillo demoledor", 2, 120000).await;

        let loan = fx
            .office
            .loans
            .create_loan(
                loan_for(
                    &fx.client,
                    &tool.id,
                    Some(today() - Duration::days(5)),
                    today() - Duration::days(2),
                ),
                "clerk",
            )
            .await
            .unwrap();

        let closed = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap();

        // 5 × 1000 + 2 × 2000
        assert_eq!(closed.total_charge, Money::new(9000));
        assert_eq!(closed.status, LoanStatus::Closed);
        assert_eq!(closed.return_date, Some(today()));

        let client = fx.office.clients.get_by_id(&fx.client.id).await.unwrap();
        assert_eq!(client.status, ClientStatus::Restricted);

        let tool = fx.office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.stock, 2);
        assert_eq!(tool.status, ToolStatus::Available);
        assert_eq!(
            fx.office
                .kardex
                .movements_by_tool_and_type(&tool.id, MovementType::Return)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_same_day_return_bills_one_day() {
        let fx = fixture().await;
        let tool = fx.tool("Cepillo", 1, 15000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();
        let closed = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap();

        assert_eq!(closed.total_charge, Money::new(1000));
    }

    // -------------------------------------------------------------------------
    // Scenario D: irreparable damage
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_irreparable_return_decommissions_tool() {
        let fx = fixture().await;
        let tool = fx.tool("Motosierra", 1, 50000).await;

        let loan = fx
            .office
            .loans
            .create_loan(
                loan_for(&fx.client, &tool.id, Some(today() - Duration::days(2)), today()),
                "clerk",
            )
            .await
            .unwrap();

        let closed = fx
            .office
            .loans
            .return_loan(
                &loan.id,
                ReturnRequest {
                    tool_id: tool.id.clone(),
                    damaged: true,
                    irreparable: true,
                    return_date: None,
                },
                "clerk",
            )
            .await
            .unwrap();

        // 50000 replacement + 2 rental days
        assert_eq!(closed.total_charge, Money::new(52000));

        let tool = fx.office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.status, ToolStatus::Decommissioned);
        assert_eq!(tool.stock, 0);

        let decommissions = fx
            .office
            .kardex
            .movements_by_tool_and_type(&tool.id, MovementType::Decommission)
            .await
            .unwrap();
        assert_eq!(decommissions.len(), 1);
        assert_eq!(decommissions[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_repairable_return_charges_repair_fee() {
        let fx = fixture().await;
        let tool = fx.tool("Rotomartillo", 2, 60000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();
        let closed = fx
            .office
            .loans
            .return_loan(
                &loan.id,
                ReturnRequest {
                    tool_id: tool.id.clone(),
                    damaged: true,
                    irreparable: false,
                    return_date: None,
                },
                "clerk",
            )
            .await
            .unwrap();

        // 1 day + repair fee 5000
        assert_eq!(closed.total_charge, Money::new(6000));

        let tool = fx.office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.status, ToolStatus::Repairing);
        // One unit out on loan, one in the workshop, none on the shelf
        assert_eq!(tool.stock, 0);
    }

    #[tokio::test]
    async fn test_repairable_return_aborts_when_tool_already_in_workshop() {
        let fx = fixture().await;
        let tool = fx.tool("Esmeril", 3, 40000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();
        fx.office.inventory.send_to_repair(&tool.id, "admin").await.unwrap();
        let before = fx.office.kardex.all_movements().await.unwrap().len();

        let err = fx
            .office
            .loans
            .return_loan(
                &loan.id,
                ReturnRequest {
                    tool_id: tool.id.clone(),
                    damaged: true,
                    irreparable: false,
                    return_date: None,
                },
                "clerk",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        // Whole return rolled back
        let loan = fx.office.loans.get_loan(&loan.id).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(fx.office.kardex.all_movements().await.unwrap().len(), before);
        let client = fx.office.clients.get_by_id(&fx.client.id).await.unwrap();
        assert_eq!(client.status, ClientStatus::Active);
    }

    // -------------------------------------------------------------------------
    // Scenario E: reactivation after payment
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reactivation_requires_payment() {
        let fx = fixture().await;
        let tool = fx.tool("Betonera", 1, 250000).await;

        let loan = fx
            .office
            .loans
            .create_loan(
                loan_for(
                    &fx.client,
                    &tool.id,
                    Some(today() - Duration::days(5)),
                    today() - Duration::days(2),
                ),
                "clerk",
            )
            .await
            .unwrap();
        let closed = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap();
        assert_eq!(closed.total_charge, Money::new(9000));

        let err = fx
            .office
            .loans
            .attempt_client_reactivation(&fx.client.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let paid = fx.office.loans.mark_loan_as_paid(&loan.id).await.unwrap();
        assert!(paid.total_charge.is_zero());
        assert_eq!(paid.status, LoanStatus::Closed);

        // Paying alone does not reactivate
        let client = fx.office.clients.get_by_id(&fx.client.id).await.unwrap();
        assert_eq!(client.status, ClientStatus::Restricted);

        let client = fx
            .office
            .loans
            .attempt_client_reactivation(&fx.client.id)
            .await
            .unwrap();
        assert_eq!(client.status, ClientStatus::Active);
    }

    #[tokio::test]
    async fn test_reactivation_blocked_by_late_loan() {
        let fx = fixture().await;
        let late_tool = fx.tool("Carro", 1, 50000).await;

        fx.office
            .loans
            .create_loan(
                loan_for(&fx.client, &late_tool.id, Some(date(2025, 3, 1)), date(2025, 3, 3)),
                "clerk",
            )
            .await
            .unwrap();
        fx.office.loans.mark_overdue(today()).await.unwrap();
        fx.office
            .clients
            .update_status(&fx.client.id, ClientStatus::Restricted)
            .await
            .unwrap();

        let err = fx
            .office
            .loans
            .attempt_client_reactivation(&fx.client.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::OutstandingBalance { late_loans: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_reactivating_active_client_is_noop() {
        let fx = fixture().await;
        let client = fx
            .office
            .loans
            .attempt_client_reactivation(&fx.client.id)
            .await
            .unwrap();
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.version, fx.client.version);
    }

    // -------------------------------------------------------------------------
    // Return edge cases
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_second_return_fails() {
        let fx = fixture().await;
        let tool = fx.tool("Tronzadora", 1, 70000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();
        fx.office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap();

        let err = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::LoanAlreadyClosed { .. })
        ));

        let tool = fx.office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.stock, 1);
    }

    #[tokio::test]
    async fn test_return_validation() {
        let fx = fixture().await;
        let tool = fx.tool("Serrucho", 2, 9000).await;
        let other = fx.tool("Formón", 2, 9000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();

        let err = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&other.id), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut early = intact(&tool.id);
        early.return_date = Some(today() - Duration::days(1));
        let err = fx
            .office
            .loans
            .return_loan(&loan.id, early, "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = fx
            .office
            .loans
            .return_loan("missing", intact(&tool.id), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_late_loan_can_be_returned() {
        let fx = fixture().await;
        let tool = fx.tool("Taladro banco", 1, 90000).await;

        let loan = fx
            .office
            .loans
            .create_loan(
                loan_for(&fx.client, &tool.id, Some(date(2025, 3, 1)), date(2025, 3, 4)),
                "clerk",
            )
            .await
            .unwrap();
        fx.office.loans.mark_overdue(today()).await.unwrap();
        assert_eq!(
            fx.office.loans.get_loan(&loan.id).await.unwrap().status,
            LoanStatus::Late
        );

        let closed = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap();
        // 9 rental days × 1000 + 6 late days × 2000
        assert_eq!(closed.total_charge, Money::new(21000));
    }

    #[tokio::test]
    async fn test_return_without_tariff_is_not_configured() {
        let office = crate::test_support::back_office_without_tariff().await;
        let fx = BackOfficeFixture::new(office).await;
        let tool = fx.tool("Llana", 1, 5000).await;

        let loan = fx
            .office
            .loans
            .create_loan(loan_for(&fx.client, &tool.id, None, today()), "clerk")
            .await
            .unwrap();
        let err = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
        assert_eq!(
            fx.office.loans.get_loan(&loan.id).await.unwrap().status,
            LoanStatus::Active
        );
    }

    #[tokio::test]
    async fn test_return_with_oversized_charge_rolls_back() {
        let fx = fixture().await;
        fx.office
            .tariffs
            .update_tariff(toolshed_core::TariffValues {
                daily_rental_fee: Money::new(i64::MAX / 2),
                ..crate::test_support::standard_tariff()
            })
            .await
            .unwrap();
        let tool = fx.tool("Andamio", 1, 80000).await;

        let loan = fx
            .office
            .loans
            .create_loan(
                loan_for(
                    &fx.client,
                    &tool.id,
                    Some(today() - Duration::days(3)),
                    today() + Duration::days(1),
                ),
                "clerk",
            )
            .await
            .unwrap();

        let err = fx
            .office
            .loans
            .return_loan(&loan.id, intact(&tool.id), "clerk")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let loan = fx.office.loans.get_loan(&loan.id).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert!(loan.total_charge.is_zero());
        assert_eq!(fx.office.inventory.get_tool(&tool.id).await.unwrap().stock, 0);
        let client = fx.office.clients.get_by_id(&fx.client.id).await.unwrap();
        assert_eq!(client.status, ClientStatus::Active);
    }

    #[tokio::test]
    async fn test_loan_reads() {
        let fx = fixture().await;
        let other = fx
            .office
            .clients
            .create(new_client("7654321-6", "Otro"))
            .await
            .unwrap();
        let tool = fx.tool("Brocha", 3, 3000).await;

        for client in [&fx.client, &other] {
            fx.office
                .loans
                .create_loan(loan_for(client, &tool.id, None, today()), "clerk")
                .await
                .unwrap();
        }

        assert_eq!(fx.office.loans.list_loans().await.unwrap().len(), 2);
        assert_eq!(
            fx.office.loans.loans_for_client(&other.id).await.unwrap().len(),
            1
        );
        let err = fx.office.loans.loans_for_client("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = fx.office.loans.get_loan("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    /// File-backed office so the pool hands out separate connections.
    async fn file_backed_office() -> (crate::BackOffice, toolshed_db::Database, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("toolshed-race-{}.db", uuid::Uuid::new_v4()));
        let db = toolshed_db::Database::new(toolshed_db::DbConfig::new(&path))
            .await
            .unwrap();
        let office = crate::BackOffice::new(db.clone(), crate::test_support::fixed_clock());
        office
            .tariffs
            .update_tariff(crate::test_support::standard_tariff())
            .await
            .unwrap();
        (office, db, path)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_loans_for_last_unit() {
        let (office, db, path) = file_backed_office().await;

        let tool = office
            .inventory
            .create_tool(crate::test_support::new_tool("Generador", 1, 400000), "admin")
            .await
            .unwrap();
        let first = office.clients.create(new_client("11111111-1", "Uno")).await.unwrap();
        let second = office.clients.create(new_client("22222222-2", "Dos")).await.unwrap();

        let due = today() + Duration::days(1);
        let (a, b) = tokio::join!(
            office.loans.create_loan(loan_for(&first, &tool.id, None, due), "clerk"),
            office.loans.create_loan(loan_for(&second, &tool.id, None, due), "clerk"),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for err in outcomes.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err.kind(),
                ErrorKind::Conflict | ErrorKind::InvalidOperation
            ));
        }

        let tool = office.inventory.get_tool(&tool.id).await.unwrap();
        assert_eq!(tool.stock, 0);
        assert_eq!(
            office
                .kardex
                .movements_by_tool_and_type(&tool.id, MovementType::Loan)
                .await
                .unwrap()
                .len(),
            1
        );

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_loans_for_fifth_slot() {
        let (office, db, path) = file_backed_office().await;
        let client = office.clients.create(new_client("12345678-5", "Uno")).await.unwrap();
        let due = today() + Duration::days(5);

        for name in ["Taladro", "Sierra", "Lijadora", "Caladora"] {
            let tool = office
                .inventory
                .create_tool(crate::test_support::new_tool(name, 2, 50000), "admin")
                .await
                .unwrap();
            office
                .loans
                .create_loan(loan_for(&client, &tool.id, None, due), "clerk")
                .await
                .unwrap();
        }

        let mut contested = Vec::new();
        for name in ["Esmeril", "Rotomartillo"] {
            contested.push(
                office
                    .inventory
                    .create_tool(crate::test_support::new_tool(name, 2, 50000), "admin")
                    .await
                    .unwrap(),
            );
        }

        let (a, b) = tokio::join!(
            office.loans.create_loan(loan_for(&client, &contested[0].id, None, due), "clerk"),
            office.loans.create_loan(loan_for(&client, &contested[1].id, None, due), "clerk"),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for err in outcomes.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err.kind(),
                ErrorKind::Conflict | ErrorKind::InvalidOperation
            ));
        }

        let mut conn = db.acquire().await.unwrap();
        let open = LoanRepository::count_open_for_client(&mut conn, &client.id)
            .await
            .unwrap();
        assert_eq!(open, 5);
        drop(conn);

        // Only the winning tool lost a unit
        let mut stock_total = 0;
        for tool in &contested {
            stock_total += office.inventory.get_tool(&tool.id).await.unwrap().stock;
        }
        assert_eq!(stock_total, 3);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
