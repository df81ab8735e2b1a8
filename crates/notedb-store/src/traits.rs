use notedb_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Content-addressed object store.
///
/// Objects are immutable once written and the same data always produces the
/// same id, so writes are idempotent and concurrent reads are always safe.
pub trait ObjectStore: Send + Sync {
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its id. Writing an existing object is a
    /// no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.read(id)?.is_some())
    }

    /// Default implementation calls `write()` for each object.
    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }
}

/// Writer that may buffer objects before they reach a store.
///
/// Objects passed to [`insert`](ObjectInserter::insert) are only guaranteed
/// to be readable from the store after [`flush`](ObjectInserter::flush).
pub trait ObjectInserter: Send {
    fn insert(&mut self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn flush(&mut self) -> StoreResult<()>;

    /// Release the inserter. Unflushed objects are discarded.
    fn close(&mut self);
}
