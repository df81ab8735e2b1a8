//! Buffering [`ObjectInserter`] backed by an [`ObjectStore`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use notedb_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::{ObjectInserter, ObjectStore};

/// Inserter that holds objects in memory until [`flush`](ObjectInserter::flush)
/// writes them to the backing store in one batch.
pub struct StoreInserter {
    store: Arc<dyn ObjectStore>,
    pending: Vec<StoredObject>,
    closed: bool,
}

impl StoreInserter {
    /// Create an inserter that flushes into `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Objects inserted but not yet flushed.
    pub fn pending(&self) -> &[StoredObject] {
        &self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ObjectInserter for StoreInserter {
    fn insert(&mut self, object: &StoredObject) -> StoreResult<ObjectId> {
        if self.closed {
            return Err(StoreError::InserterClosed);
        }
        let id = object.compute_id();
        if !self.pending.iter().any(|o| o.compute_id() == id) {
            self.pending.push(object.clone());
        }
        Ok(id)
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::InserterClosed);
        }
        if self.pending.is_empty() {
            return Ok(());
        }
        self.store.write_batch(&self.pending)?;
        debug!(count = self.pending.len(), "flushed inserter");
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.pending.clear();
        self.closed = true;
    }
}

/// Lets a caller hand an inserter to another component and still inspect it
/// afterwards.
impl<T: ObjectInserter> ObjectInserter for Arc<Mutex<T>> {
    fn insert(&mut self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.lock().unwrap_or_else(PoisonError::into_inner).insert(object)
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }

    fn close(&mut self) {
        self.lock().unwrap_or_else(PoisonError::into_inner).close()
    }
}

impl std::fmt::Debug for StoreInserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreInserter")
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use crate::object::Blob;

    #[test]
    fn objects_reach_store_only_on_flush() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut ins = StoreInserter::new(store.clone());
        let id = ins
            .insert(&Blob::new(b"note".to_vec()).to_stored_object())
            .unwrap();

        assert_eq!(ins.pending().len(), 1);
        assert!(!store.exists(&id).unwrap());

        ins.flush().unwrap();
        assert!(ins.pending().is_empty());
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn duplicate_inserts_are_buffered_once() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut ins = StoreInserter::new(store);
        let obj = Blob::new(b"same".to_vec()).to_stored_object();
        assert_eq!(ins.insert(&obj).unwrap(), ins.insert(&obj).unwrap());
        assert_eq!(ins.pending().len(), 1);
    }

    #[test]
    fn shared_inserter_stays_inspectable() {
        let store = Arc::new(InMemoryObjectStore::new());
        let shared = Arc::new(Mutex::new(StoreInserter::new(store)));
        let mut handle: Box<dyn ObjectInserter> = Box::new(shared.clone());
        handle
            .insert(&Blob::new(b"seen by caller".to_vec()).to_stored_object())
            .unwrap();
        assert_eq!(shared.lock().unwrap().pending().len(), 1);
    }

    #[test]
    fn closed_inserter_rejects_work() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut ins = StoreInserter::new(store.clone());
        ins.insert(&Blob::new(b"dropped".to_vec()).to_stored_object())
            .unwrap();
        ins.close();

        assert!(ins.is_closed());
        assert!(matches!(
            ins.insert(&Blob::new(b"late".to_vec()).to_stored_object()),
            Err(StoreError::InserterClosed)
        ));
        assert!(matches!(ins.flush(), Err(StoreError::InserterClosed)));
        assert!(store.is_empty());
    }
}
