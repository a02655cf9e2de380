//! # Storage Errors
//!
//! `DbError` classifies what SQLite reported so the engine can tell a lost
//! race (`Conflict`, `Busy`) from a constraint hit or a genuine fault.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← constraint, lock or version-check classification            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError::Storage (toolshed-engine) ← classified into ErrorKind    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer maps ErrorKind to a response code                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A targeted write found no row (e.g. charging an unknown loan).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a client whose RUT is already taken, when a concurrent
    ///   registration slipped past the engine's pre-check
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A loan or kardex entry referencing a tool/client that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, bad enum text, ...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// A version-checked update matched no row.
    ///
    /// ## When This Occurs
    /// ```text
    /// Tx A reads tool v3 ──────────────► UPDATE ... WHERE version = 3 ✓ (v4)
    /// Tx B reads tool v3 ───────────────────────► UPDATE ... WHERE version = 3
    ///                                                  │
    ///                                                  ▼
    ///                                     0 rows → Conflict { tool, id }
    /// ```
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// SQLite refused the write because another transaction holds the lock
    /// or committed first.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// The file could not be opened or created, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other error SQLite reported for a statement.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `field` is `table.column` as SQLite names it.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// SQLite primary/extended result codes that mean "someone else holds the
/// write lock": BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE,
/// BUSY_SNAPSHOT.
const BUSY_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// ```text
/// RowNotFound          → NotFound
/// Database(UNIQUE)     → UniqueViolation { field: "table.column" }
/// Database(FOREIGN)    → ForeignKeyViolation
/// Database(CHECK)      → CheckViolation
/// Database(BUSY/LOCK)  → Busy
/// PoolTimedOut         → PoolExhausted
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if code.as_deref().is_some_and(|c| BUSY_CODES.contains(&c))
                    || msg.contains("database is locked")
                {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
