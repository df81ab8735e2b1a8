use notedb_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Attempted to write an object whose id is the zero id.
    #[error("cannot store object with zero ID")]
    ZeroObjectId,

    /// The inserter was used after being closed.
    #[error("inserter is closed")]
    InserterClosed,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
