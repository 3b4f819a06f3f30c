//! SQLite connection pool

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// How long a connection waits for the write lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Statement opening a transaction that takes the write lock up front
///
/// Transactions that read before they write must not start deferred: the
/// later lock upgrade fails immediately with `SQLITE_BUSY` in WAL mode
/// instead of waiting for the busy timeout.
pub const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// Initialize the database connection pool and run migrations
pub async fn init(database_url: &str) -> anyhow::Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        if let Some(path) = path.split('?').next() {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// In-memory pool with migrations applied
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// File-backed pool built the way the server builds it
#[cfg(test)]
pub async fn create_file_pool(dir: &std::path::Path) -> SqlitePool {
    let url = format!("sqlite:{}", dir.join("remote_dev.db").display());
    init(&url).await.expect("Failed to create file pool")
}
