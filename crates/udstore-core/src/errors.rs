//! Error types for the membership store.

use thiserror::Error;

/// Membership store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing-store execution failure (connectivity, malformed statement,
    /// constraint violation).
    #[error("database error during {context}: {message}")]
    Database { context: String, message: String },

    /// A required collaborator was not supplied at construction.
    #[error("missing required dependency: {0}")]
    MissingDependency(&'static str),

    /// The sync transaction failed and rolling it back failed as well.
    /// The backing store is in an unknown state.
    #[error("rollback failed after transaction error ({cause}): {message}")]
    RollbackFailed {
        cause: Box<StoreError>,
        message: String,
    },

    /// No query catalog exists for the configured database identifier.
    #[error("unsupported database: {0}")]
    UnsupportedDatabase(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn database(context: impl Into<String>, err: rusqlite::Error) -> Self {
        Self::Database {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// True when the backing store may be left inconsistent and the caller
    /// should stop using it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. } | Self::LockPoisoned)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::database("query", e)
    }
}

/// Result type for membership store operations.
pub type StoreResult<T> = Result<T, StoreError>;
