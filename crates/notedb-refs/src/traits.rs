//! The [`RefDatabase`] trait defining the ref storage interface.

use notedb_store::ObjectStore;
use notedb_types::ObjectId;

use crate::batch::BatchRefUpdate;
use crate::error::Result;

/// Storage backend for a repository's refs.
///
/// Refs are the only mutable state of a repository. Every write goes through
/// [`execute_batch`](RefDatabase::execute_batch), which applies each command
/// as a compare-and-swap against the command's old id and reports a
/// per-command [`CommandResult`](crate::CommandResult).
pub trait RefDatabase: Send + Sync {
    /// Current tip of `name`, or `Ok(None)` if the ref does not exist.
    fn exact_ref(&self, name: &str) -> Result<Option<ObjectId>>;

    /// All refs whose name starts with `prefix`, sorted by name.
    fn refs_by_prefix(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>>;

    /// Whether a batch can be applied all-or-nothing.
    fn performs_atomic_transactions(&self) -> bool;

    fn new_batch_update(&self) -> BatchRefUpdate {
        BatchRefUpdate::new(self.performs_atomic_transactions())
    }

    /// Execute every command of `batch`, recording results on the commands.
    ///
    /// `objects` is consulted to check that new tips exist and, unless the
    /// batch allows non-fast-forwards, that each update descends from the
    /// old tip. `Err` is reserved for failures of the database itself;
    /// rejected commands are reported through their results.
    fn execute_batch(&self, batch: &mut BatchRefUpdate, objects: &dyn ObjectStore) -> Result<()>;
}
