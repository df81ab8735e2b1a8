//! Write buffer used while staging.

use std::collections::HashMap;
use std::sync::Arc;

use notedb_store::{CommitObject, ObjectStore, StoreError, StoreResult, StoredObject};
use notedb_types::ObjectId;

/// An object created during staging, with its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertedObject {
    id: ObjectId,
    object: StoredObject,
}

impl InsertedObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn object(&self) -> &StoredObject {
        &self.object
    }
}

/// Buffers new objects in memory and serves reads from the buffer before
/// falling back to the durable store, so producers can build on commits
/// staged earlier in the same pass.
pub struct InMemoryInserter {
    store: Arc<dyn ObjectStore>,
    inserted: Vec<InsertedObject>,
    index: HashMap<ObjectId, usize>,
}

impl InMemoryInserter {
    /// Buffer over `store`; nothing is written to it.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            inserted: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Buffer `object`, returning its id. Inserting the same object twice is a no-op.
    pub fn insert(&mut self, object: StoredObject) -> ObjectId {
        let id = object.compute_id();
        if !self.index.contains_key(&id) {
            self.index.insert(id, self.inserted.len());
            self.inserted.push(InsertedObject { id, object });
        }
        id
    }

    /// Encode and buffer a commit.
    pub fn insert_commit(&mut self, commit: &CommitObject) -> StoreResult<ObjectId> {
        Ok(self.insert(commit.to_stored_object()?))
    }

    /// Read from the buffer first, then the backing store.
    pub fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        match self.index.get(id) {
            Some(&i) => Ok(Some(self.inserted[i].object.clone())),
            None => self.store.read(id),
        }
    }

    /// Read and decode a commit, buffered or stored.
    pub fn read_commit(&self, id: &ObjectId) -> StoreResult<CommitObject> {
        let obj = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        CommitObject::from_stored_object(&obj)
    }

    /// Objects inserted since the last [`clear`](Self::clear), in insertion
    /// order.
    pub fn inserted_objects(&self) -> &[InsertedObject] {
        &self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    /// Drop every buffered object.
    pub fn clear(&mut self) {
        self.inserted.clear();
        self.index.clear();
    }
}

impl std::fmt::Debug for InMemoryInserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryInserter")
            .field("inserted", &self.inserted.len())
            .finish()
    }
}
