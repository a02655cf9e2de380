//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and
//! applied by `Database::new`. sqlx records applied versions in
//! `_sqlx_migrations` and runs each pending file in its own transaction.
//!
//! Files are `NNN_description.sql`, applied in order. A released file is
//! never edited; schema changes go in a new file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts. A database that has never been
/// migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
