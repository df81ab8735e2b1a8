//! History traversal over commit objects.

use std::collections::{HashSet, VecDeque};

use notedb_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::CommitObject;
use crate::traits::ObjectStore;

/// Read and decode the commit at `id`.
pub fn read_commit(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<CommitObject> {
    let obj = store.read(id)?.ok_or(StoreError::NotFound(*id))?;
    CommitObject::from_stored_object(&obj)
}

/// Returns `true` if `ancestor` is reachable from `tip` through parent links.
///
/// A commit counts as its own ancestor.
pub fn is_ancestor(store: &dyn ObjectStore, ancestor: &ObjectId, tip: &ObjectId) -> StoreResult<bool> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([*tip]);
    while let Some(id) = queue.pop_front() {
        if id == *ancestor {
            return Ok(true);
        }
        if !seen.insert(id) {
            continue;
        }
        queue.extend(read_commit(store, &id)?.parents);
    }
    Ok(false)
}
