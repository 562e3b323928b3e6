use crate::config::AppConfig;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

const MAX_CONNECTIONS: u32 = 8;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

/// Open the shared connection pool used by every request.
pub async fn create_pool(config: &AppConfig) -> Result<SqlitePool, DatabaseError> {
    info!(url = %config.storage.database_url, "Initializing database connection pool");

    let connect_options = SqliteConnectOptions::from_str(&config.storage.database_url)
        .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}

/// Open the pool and make sure the schema exists, session table included.
pub async fn initialize_database(config: &AppConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(config).await?;

    create_tables(&pool).await?;
    SqliteStore::new(pool.clone()).migrate().await?;

    info!("Database initialization completed successfully");

    Ok(pool)
}

/// Create all required tables. Safe to run against an existing database.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), DatabaseError> {
    // AUTOINCREMENT keeps ids from ever being reused, even after deletes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS uploaded_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            uploader TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_uploaded_files_created_at ON uploaded_files(created_at)",
    )
    .execute(pool)
    .await?;

    // Credentials are provisioned out-of-band; salt and hash are hex encoded
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY NOT NULL,
            salt TEXT NOT NULL,
            hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_tables_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::for_testing(dir.path());
        let pool = initialize_database(&config).await.unwrap();

        create_tables(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["tower_sessions", "uploaded_files", "users"]);
    }
}
