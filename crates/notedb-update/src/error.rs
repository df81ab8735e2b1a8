//! Error types for the update coordinator.

use thiserror::Error;

use notedb_types::{AccountId, ChangeId, ObjectId};

/// Failure to decode a note commit read back from a repository.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot parse note {id}: {reason}")]
pub struct NoteParseError {
    pub id: ObjectId,
    pub reason: String,
}

/// Errors raised while accumulating, staging or committing NoteDb updates.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Writes are administratively disabled.
    #[error("NoteDb changes are read-only")]
    ReadOnly,

    /// The change's meta ref moved since the caller read it.
    #[error("expected change {change_id} to have meta {expected}")]
    MismatchedState {
        change_id: ChangeId,
        expected: ObjectId,
    },

    /// A reviewer's draft ref moved since the caller read it.
    #[error("expected drafts of account {account_id} on change {change_id} to be {expected}")]
    DraftStateMismatch {
        change_id: ChangeId,
        account_id: AccountId,
        expected: ObjectId,
    },

    #[error("Cannot rewrite commit history of {ref_name}: {source}")]
    Rewrite {
        ref_name: String,
        #[source]
        source: NoteParseError,
    },

    #[error("cannot update and rewrite ref {ref_name} in one BatchUpdate")]
    ConflictingRefGroup { ref_name: String },

    #[error("Ref {ref_name} is empty")]
    EmptyRef { ref_name: String },

    /// Every failed command lost a compare-and-swap race. Safe to retry.
    #[error("Update aborted with one or more lock failures: {0}")]
    LockFailure(String),

    #[error("Update failed: {0}")]
    Storage(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid change state: {0}")]
    InvalidChangeState(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Note content could not be decoded outside of a rewrite.
    #[error(transparent)]
    Parse(#[from] NoteParseError),

    #[error("store error: {0}")]
    Store(#[from] notedb_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] notedb_refs::RefError),

    #[error("type error: {0}")]
    Type(#[from] notedb_types::TypeError),
}

impl UpdateError {
    /// Whether the caller may retry the whole operation from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockFailure(_))
    }
}

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_failures_are_retryable() {
        assert!(UpdateError::LockFailure("x".into()).is_retryable());
        assert!(!UpdateError::Storage("x".into()).is_retryable());
        assert!(!UpdateError::ReadOnly.is_retryable());
    }

    #[test]
    fn messages() {
        assert_eq!(UpdateError::ReadOnly.to_string(), "NoteDb changes are read-only");
        let err = UpdateError::ConflictingRefGroup {
            ref_name: "refs/changes/01/1/robot-comments".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot update and rewrite ref refs/changes/01/1/robot-comments in one BatchUpdate"
        );
        let err = UpdateError::Rewrite {
            ref_name: "refs/changes/01/1/meta".into(),
            source: NoteParseError {
                id: ObjectId::from_bytes(b"x"),
                reason: "bad json".into(),
            },
        };
        assert!(err.to_string().starts_with("Cannot rewrite commit history"));
    }
}
