//! # Connection Pool
//!
//! One `SqlitePool` per process, shared by every service through a cheap
//! `Database` handle. Services never hold the pool directly: they ask for a
//! transaction or a read connection and hand `&mut` of it to repositories.
//!
//! ## Where Connections Go
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   EngineConfig ──► DbConfig ──► Database::new ──► migrations applied   │
//! │                                      │                                  │
//! │                ┌─────────────────────┴─────────────────────┐            │
//! │                ▼                                           ▼            │
//! │        db.begin()                                   db.acquire()        │
//! │   (every mutation: loan,                       (reads and reports)      │
//! │    return, adjustment...)                                               │
//! │                │                                           │            │
//! │                ▼                                           ▼            │
//! │   ToolRepository::update(&mut tx)            LoanRepository::list(..)   │
//! │   KardexRepository::append(&mut tx)                                     │
//! │                │                                                        │
//! │        commit() or drop = rollback                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## File vs Memory
//! - File databases use WAL with NORMAL sync. Readers never wait on the
//!   writer; a writer whose snapshot went stale gets BUSY and the engine
//!   reports `Conflict`.
//! - `:memory:` lives inside one connection, so the pool is pinned to a
//!   single connection that is never recycled. Holding a transaction and
//!   asking for a second connection on such a pool waits forever.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool and connection settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/toolshed/toolshed.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (default 5).
    pub max_connections: u32,

    /// Connections kept open while idle (default 1).
    pub min_connections: u32,

    /// How long `begin`/`acquire` wait for a free connection (default 30s).
    pub connect_timeout: Duration,

    /// How long a writer waits on a held lock before BUSY (default 5s).
    pub busy_timeout: Duration,

    /// Idle connections above the minimum are closed after this.
    pub idle_timeout: Option<Duration>,

    /// Apply pending migrations in `Database::new` (default true).
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed settings. The file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Private database for tests and throwaway runs.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // Foreign keys are off per connection unless asked for
        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout);

        if self.is_memory() {
            // Recycling the only connection would drop the whole database
            options.max_lifetime(None::<Duration>)
        } else {
            options
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the pool. Clones are cheap and see the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    ///
    /// ## Errors
    /// `ConnectionFailed` if the file cannot be opened or created;
    /// `MigrationFailed` if a migration does not apply.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let connect_options = config.connect_options()?;
        debug!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening database"
        );

        let pool = config
            .pool_options()
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Database ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction. Dropping it uncommitted rolls back every write
    /// made through it.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::Internal(format!("begin transaction: {}", e)))
    }

    /// A plain connection for reads.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Waits for checked-out connections to come back, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database closed");
    }

    /// `true` if a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
