//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored row could not be decoded
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for nodekeys_core::Error {
    fn from(e: Error) -> Self {
        nodekeys_core::Error::PersistenceUnavailable(e.to_string())
    }
}
