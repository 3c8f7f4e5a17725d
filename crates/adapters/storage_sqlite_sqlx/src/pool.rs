//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;

/// Configuration for the `SQLite` store.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:smarthome.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self.database_url).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn initialize(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // every connection to `:memory:` opens its own empty database
        let pool = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(database_url, "store ready");

        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
