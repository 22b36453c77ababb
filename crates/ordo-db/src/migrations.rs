//! # Database Migrations
//!
//! Embedded SQL migrations. The `sqlx::migrate!()` macro embeds every file
//! from `migrations/sqlite/` into the binary at compile time; applied
//! migrations are tracked in the `_sqlx_migrations` table, so running them
//! is idempotent.
//!
//! Adding a migration: create `migrations/sqlite/NNN_description.sql` with
//! the next sequence number. Never modify an existing migration.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations, in filename order, each in its own
/// transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied");
    Ok(())
}
