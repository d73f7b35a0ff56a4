//! Database module

pub mod queries;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Run database migrations.
///
/// Stored checksums that differ from the embedded ones (CRLF/LF checkouts)
/// are rewritten before running.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    let migrator = sqlx::migrate!("./migrations");

    let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();
    info!("Compiled migration versions: {:?}", versions);

    sync_checksums(pool, &migrator).await?;
    migrator.run(pool).await.context("Failed to run migrations")?;

    info!("Database migrations complete");
    Ok(())
}

async fn sync_checksums(pool: &PgPool, migrator: &sqlx::migrate::Migrator) -> Result<()> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(());
    }

    for migration in migrator.iter().filter(|m| !m.migration_type.is_down_migration()) {
        let stored: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT checksum FROM _sqlx_migrations WHERE version = $1")
                .bind(migration.version)
                .fetch_optional(pool)
                .await?;

        let current: &[u8] = &migration.checksum;
        if matches!(stored, Some(ref s) if s.as_slice() != current) {
            warn!(
                "Migration {} ({}) checksum mismatch, updating stored checksum",
                migration.version, migration.description
            );
            sqlx::query("UPDATE _sqlx_migrations SET checksum = $1 WHERE version = $2")
                .bind(current)
                .bind(migration.version)
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}
