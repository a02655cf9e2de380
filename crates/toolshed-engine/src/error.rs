//! # Engine Error Type
//!
//! Unified error type returned by every service operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Engine                             │
//! │                                                                         │
//! │  LoanEngine::create_loan(..)                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Business rule failed? ── CoreError::ClientRestricted ──┐              │
//! │         │                                               │              │
//! │         ▼                                               ▼              │
//! │  Storage failed? ──────── DbError::Busy ──────────► EngineError        │
//! │         │                                               │              │
//! │         ▼                                               ▼              │
//! │  Success                                     kind()           → code   │
//! │                                              public_message() → text   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain failures are safe to show verbatim. Unclassified storage failures
//! are logged with full detail and surfaced with a generic message.

use thiserror::Error;
use toolshed_core::{CoreError, ErrorKind};
use toolshed_db::DbError;

/// Error returned by engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule or input check failed. Nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The database failed; the transaction was rolled back.
    #[error(transparent)]
    Storage(DbError),
}

impl EngineError {
    /// Classifies the error for the boundary layer.
    ///
    /// ## Mapping
    /// ```text
    /// Domain(e)                       → e.kind()
    /// Storage(NotFound)               → NotFound
    /// Storage(Conflict | Busy)        → Conflict   (retryable)
    /// Storage(UniqueViolation)        → AlreadyExists
    /// Storage(anything else)          → Internal
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(e) => e.kind(),
            EngineError::Storage(DbError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Storage(DbError::Conflict { .. } | DbError::Busy(_)) => {
                ErrorKind::Conflict
            }
            EngineError::Storage(DbError::UniqueViolation { .. }) => ErrorKind::AlreadyExists,
            EngineError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => {
                // Log the actual error but return a generic message
                tracing::error!(error = ?self, "Unclassified engine failure");
                "An internal error occurred".to_string()
            }
            ErrorKind::Conflict => {
                "The record was changed by another operation, please retry".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// True when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Converts storage errors, lifting a duplicate RUT into the domain error
/// the pre-check would have raised.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { field, value } if field == "clients.rut" => {
                EngineError::Domain(CoreError::AlreadyExists {
                    field: "rut".to_string(),
                    value,
                })
            }
            other => EngineError::Storage(other),
        }
    }
}

/// Transaction begin/commit goes through sqlx directly.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

impl From<toolshed_core::ValidationError> for EngineError {
    fn from(err: toolshed_core::ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
