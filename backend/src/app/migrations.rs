use std::fs::File;
use std::io::Write;
use std::path::Path;

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError as SqlxMigrateError;
use thiserror::Error;

use crate::db::DbPool;

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to run embedded migrations")]
    EmbeddedMigrationFailed { source: SqlxMigrateError },

    #[error("No migrations applied yet")]
    NoMigrationsApplied,

    #[error("Failed to fetch applied migrations")]
    FetchAppliedMigrationsFailed { #[from] source: SqlxError },

    #[error("File system error")]
    FileSystemOperationFailed { #[from] source: std::io::Error },
}

/// List all embedded migrations
#[must_use]
pub fn list_migrations() -> Vec<String> {
    sqlx::migrate!("./migrations")
        .iter()
        .map(|m| format!("{} {}", m.version, m.description))
        .collect::<Vec<_>>()
}

/// Runs the embedded migrations
pub async fn run_migrations(db: &DbPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .map_err(|e| MigrationError::EmbeddedMigrationFailed { source: e })?;
    tracing::info!("Database migrations completed successfully.");
    Ok(())
}

/// Check if migrations need to be applied
pub async fn check_pending_migrations(db: &DbPool) -> Result<bool, MigrationError> {
    let tracked = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(db)
    .await?;
    if !tracked {
        return Err(MigrationError::NoMigrationsApplied);
    }

    let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(db)
        .await?;
    let available = sqlx::migrate!("./migrations").iter().count();
    Ok(usize::try_from(applied).unwrap_or(0) < available)
}

/// Create a new migration file with the current timestamp
pub fn create_migration(name: &str) -> Result<String, MigrationError> {
    let migrations_path = Path::new("migrations");
    if !migrations_path.exists() {
        std::fs::create_dir_all(migrations_path)?;
    }

    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
    let normalized_name = name.replace(' ', "_").to_lowercase();
    let filename = format!("{timestamp}_{normalized_name}.sql");
    let filepath = migrations_path.join(&filename);

    let mut file = File::create(&filepath)?;
    writeln!(file, "-- Migration: {name}")?;
    writeln!(file, "--")?;
    writeln!(file, "-- Add migration script here")?;

    tracing::info!("Created new migration file: {}.", filepath.display());
    Ok(filename)
}
