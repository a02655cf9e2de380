//! # Lending Policy
//!
//! Eligibility rules checked before a loan is opened or returned, and the
//! reactivation rule for restricted clients. Each check is pure; the engine
//! feeds it rows it has already read inside the transaction.
//!
//! ## Loan Creation Order
//! ```text
//! 1. client exists, tool exists ............ NotFound         (engine)
//! 2. client not restricted ................. ensure_client_may_borrow
//! 3. tool available with stock ............. ensure_tool_lendable
//! 4. start defaults to today, due ≥ start .. resolve_loan_window
//! 5. open loans < MAX_ACTIVE_LOANS ......... ensure_below_loan_limit
//! 6. no open loan for the same tool ........ ensure_no_duplicate_loan
//! ```
//! The order is part of the contract: the first failing rule wins.

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Client, Loan, Tool, ToolStatus};
use crate::MAX_ACTIVE_LOANS;

pub fn ensure_client_may_borrow(client: &Client) -> CoreResult<()> {
    if client.is_restricted() {
        return Err(CoreError::ClientRestricted {
            client_id: client.id.clone(),
        });
    }
    Ok(())
}

pub fn ensure_tool_lendable(tool: &Tool) -> CoreResult<()> {
    if tool.status != ToolStatus::Available || tool.stock <= 0 {
        return Err(CoreError::ToolUnavailable {
            tool_id: tool.id.clone(),
            status: tool.status,
            stock: tool.stock,
        });
    }
    Ok(())
}

/// Resolves `(start, due)`: start defaults to `today`, due is required and
/// may not precede start.
pub fn resolve_loan_window(
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> CoreResult<(NaiveDate, NaiveDate)> {
    let start = start_date.unwrap_or(today);
    let due = due_date.ok_or_else(|| ValidationError::Required {
        field: "due_date".to_string(),
    })?;

    if due < start {
        return Err(ValidationError::DateOrder {
            earlier: "start_date".to_string(),
            later: "due_date".to_string(),
        }
        .into());
    }

    Ok((start, due))
}

/// `open_loans` counts the client's ACTIVE and LATE loans.
pub fn ensure_below_loan_limit(client_id: &str, open_loans: i64) -> CoreResult<()> {
    if open_loans >= MAX_ACTIVE_LOANS {
        return Err(CoreError::LoanLimitReached {
            client_id: client_id.to_string(),
            max: MAX_ACTIVE_LOANS,
        });
    }
    Ok(())
}

pub fn ensure_no_duplicate_loan(
    client_id: &str,
    tool_id: &str,
    has_open_loan_for_tool: bool,
) -> CoreResult<()> {
    if has_open_loan_for_tool {
        return Err(CoreError::DuplicateActiveLoan {
            client_id: client_id.to_string(),
            tool_id: tool_id.to_string(),
        });
    }
    Ok(())
}

/// Checks that `loan` can be returned with `tool_id` and resolves the return
/// date (defaults to `today`, may not precede the start date).
pub fn resolve_return(
    loan: &Loan,
    tool_id: &str,
    return_date: Option<NaiveDate>,
    today: NaiveDate,
) -> CoreResult<NaiveDate> {
    if loan.tool_id != tool_id {
        return Err(ValidationError::Mismatch {
            field: "tool_id".to_string(),
            expected: loan.tool_id.clone(),
            actual: tool_id.to_string(),
        }
        .into());
    }

    if !loan.status.is_open() {
        return Err(CoreError::LoanAlreadyClosed {
            loan_id: loan.id.clone(),
        });
    }

    let returned = return_date.unwrap_or(today);
    if returned < loan.start_date {
        return Err(ValidationError::DateOrder {
            earlier: "start_date".to_string(),
            later: "return_date".to_string(),
        }
        .into());
    }

    Ok(returned)
}

/// A restricted client may be reactivated only with no LATE loans and no
/// CLOSED loan still carrying a charge.
pub fn ensure_reactivatable(client_id: &str, late_loans: i64, unpaid_loans: i64) -> CoreResult<()> {
    if late_loans > 0 || unpaid_loans > 0 {
        return Err(CoreError::OutstandingBalance {
            client_id: client_id.to_string(),
            late_loans,
            unpaid_loans,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
