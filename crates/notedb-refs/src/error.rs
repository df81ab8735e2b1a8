//! Error types for ref database and repository operations.

use thiserror::Error;

/// Errors that can occur during ref and repository operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name is malformed.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// No repository is registered under this name.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// A repository with this name already exists.
    #[error("repository already exists: {0}")]
    RepositoryExists(String),

    /// Failure reading objects while validating an update.
    #[error("store error: {0}")]
    Store(#[from] notedb_store::StoreError),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
