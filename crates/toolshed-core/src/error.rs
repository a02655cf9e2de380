//! # Error Types
//!
//! Domain-specific error types for toolshed-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  toolshed-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Malformed input                                │
//! │  └── ErrorKind        - Caller-facing classification                   │
//! │                                                                         │
//! │  toolshed-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  toolshed-engine errors                                                │
//! │  └── EngineError      - CoreError | DbError, one `kind()` for both     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         DbError ────┴→ EngineError → HTTP layer        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, statuses, counts)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::ToolStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Caller-facing classification of a failure.
///
/// The boundary layer maps each kind to its own response code. Everything
/// except `Internal` is a recoverable, caller-side condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// An id did not resolve.
    NotFound,

    /// Malformed or out-of-range input.
    Validation,

    /// A business rule refused the operation.
    InvalidOperation,

    /// A unique business key is taken.
    AlreadyExists,

    /// Required configuration (the tariff) has never been written.
    NotConfigured,

    /// A concurrent writer won the race; the caller may retry.
    Conflict,

    /// Anything unclassified. Never exposes detail to the caller.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::NotConfigured => "NOT_CONFIGURED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(code)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business logic errors.
///
/// Raised by the pure rules in this crate and by the engine before any
/// mutation begins, so a `CoreError` never leaves partial writes behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity id does not resolve.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A unique business key (the client RUT) is already registered.
    #[error("{field} '{value}' already exists")]
    AlreadyExists { field: String, value: String },

    /// The singleton tariff row has not been written yet.
    #[error("Tariff is not configured")]
    TariffNotConfigured,

    /// A restricted client tried to borrow.
    ///
    /// ## When This Occurs
    /// - The client returned a loan with a nonzero charge and has not been
    ///   reactivated since
    /// - An administrator restricted the client by hand
    #[error("Client {client_id} is restricted and cannot borrow")]
    ClientRestricted { client_id: String },

    /// The tool cannot be lent right now.
    #[error("Tool {tool_id} is not available for loan (status {status}, stock {stock})")]
    ToolUnavailable {
        tool_id: String,
        status: ToolStatus,
        stock: i64,
    },

    /// The client already holds the maximum number of open loans.
    #[error("Client {client_id} reached the maximum of {max} active loans")]
    LoanLimitReached { client_id: String, max: i64 },

    /// The client already has an open loan for this tool.
    #[error("Client {client_id} already has an active loan for tool {tool_id}")]
    DuplicateActiveLoan { client_id: String, tool_id: String },

    /// The loan was already returned.
    #[error("Loan {loan_id} is already closed")]
    LoanAlreadyClosed { loan_id: String },

    /// Decommissioning refused because units are out or under repair.
    #[error("Tool {tool_id} cannot be decommissioned while {status}")]
    ToolInUse { tool_id: String, status: ToolStatus },

    /// The tool is retired and accepts no further stock movement.
    #[error("Tool {tool_id} is decommissioned")]
    ToolDecommissioned { tool_id: String },

    /// The tool is already under repair.
    #[error("Tool {tool_id} is already under repair")]
    AlreadyInRepair { tool_id: String },

    /// A repair was completed on a tool that is not under repair.
    #[error("Tool {tool_id} is not under repair (status {status})")]
    NotInRepair { tool_id: String, status: ToolStatus },

    /// A manual stock adjustment broke the adjustment rules.
    #[error("Invalid stock adjustment for tool {tool_id}: {reason}")]
    InvalidAdjustment { tool_id: String, reason: String },

    /// A return charge does not fit in a `Money` amount.
    #[error("Charge for {component} overflows")]
    ChargeOverflow { component: &'static str },

    /// Reactivation refused while the client still owes or has late loans.
    #[error(
        "Client {client_id} cannot be reactivated: {late_loans} late loan(s), {unpaid_loans} unpaid loan(s)"
    )]
    OutstandingBalance {
        client_id: String,
        late_loans: i64,
        unpaid_loans: i64,
    },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Classifies this error for the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            CoreError::TariffNotConfigured => ErrorKind::NotConfigured,
            CoreError::ClientRestricted { .. }
            | CoreError::ToolUnavailable { .. }
            | CoreError::LoanLimitReached { .. }
            | CoreError::DuplicateActiveLoan { .. }
            | CoreError::LoanAlreadyClosed { .. }
            | CoreError::ToolInUse { .. }
            | CoreError::ToolDecommissioned { .. }
            | CoreError::AlreadyInRepair { .. }
            | CoreError::NotInRepair { .. }
            | CoreError::InvalidAdjustment { .. }
            | CoreError::ChargeOverflow { .. }
            | CoreError::OutstandingBalance { .. } => ErrorKind::InvalidOperation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements and are always
/// raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be greater than zero.
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, RUT or email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two dates are in the wrong order.
    #[error("{later} must not be before {earlier}")]
    DateOrder { earlier: String, later: String },

    /// A supplied reference does not match the stored one.
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
