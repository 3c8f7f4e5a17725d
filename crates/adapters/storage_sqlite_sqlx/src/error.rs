//! Store-specific error type wrapping sqlx errors.

use smarthome_domain::error::HomeError;

/// Errors originating from the `SQLite` store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connecting, or running a query, failed. Undecodable rows land here too.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// The embedded schema could not be applied.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for HomeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
