//! Per-repository staging context.

use std::sync::Arc;

use tracing::debug;

use notedb_refs::{RepoManager, Repository};
use notedb_store::ObjectInserter;
use notedb_types::{ObjectId, ProjectName};

use crate::chained::ChainedReceiveCommands;
use crate::error::{UpdateError, UpdateResult};
use crate::inserter::{InMemoryInserter, InsertedObject};

/// Everything staged against one repository: new objects waiting in a
/// buffer, and ref commands waiting to be sent as one batch.
///
/// Objects move from the buffer into the final inserter on
/// [`flush_to_final_inserter`](Self::flush_to_final_inserter) and reach
/// durable storage on [`flush`](Self::flush).
pub struct OpenRepo {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) temp_ins: InMemoryInserter,
    final_ins: Option<Box<dyn ObjectInserter>>,
    pub(crate) cmds: ChainedReceiveCommands,
    owned: bool,
    closed: bool,
}

impl OpenRepo {
    /// Open `name` through `manager`. The handle is released on
    /// [`close`](Self::close).
    pub(crate) fn open(manager: &dyn RepoManager, name: &ProjectName) -> UpdateResult<Self> {
        let repo = manager.open_repository(name)?;
        let final_ins = repo.new_object_inserter();
        let cmds = ChainedReceiveCommands::new(repo.clone());
        debug!(repo = %name, "opened repository for NoteDb update");
        Ok(Self::new(repo, Some(final_ins), cmds, true))
    }

    /// Wrap a handle owned by the caller. It is never closed here.
    pub(crate) fn external(
        repo: Arc<dyn Repository>,
        final_ins: Option<Box<dyn ObjectInserter>>,
        cmds: ChainedReceiveCommands,
    ) -> Self {
        Self::new(repo, final_ins, cmds, false)
    }

    fn new(
        repo: Arc<dyn Repository>,
        final_ins: Option<Box<dyn ObjectInserter>>,
        cmds: ChainedReceiveCommands,
        owned: bool,
    ) -> Self {
        let temp_ins = InMemoryInserter::new(repo.object_store());
        Self {
            repo,
            temp_ins,
            final_ins,
            cmds,
            owned,
            closed: false,
        }
    }

    pub fn repo(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Tip of `ref_name` including commands staged so far.
    pub fn get(&mut self, ref_name: &str) -> UpdateResult<Option<ObjectId>> {
        self.cmds.get(ref_name)
    }

    /// Commands staged so far, chained per ref.
    pub fn commands(&self) -> &ChainedReceiveCommands {
        &self.cmds
    }

    pub fn commands_mut(&mut self) -> &mut ChainedReceiveCommands {
        &mut self.cmds
    }

    /// Objects staged but not yet handed to the final inserter.
    pub fn inserted_objects(&self) -> &[InsertedObject] {
        self.temp_ins.inserted_objects()
    }

    /// Whether closing this context also closes the repository.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Write buffered objects into the repository.
    pub fn flush(&mut self) -> UpdateResult<()> {
        self.flush_to_final_inserter()?;
        if let Some(ins) = self.final_ins.as_mut() {
            ins.flush()?;
        }
        Ok(())
    }

    /// Move buffered objects into the caller-supplied inserter, leaving the
    /// flush to the caller.
    pub fn flush_to_final_inserter(&mut self) -> UpdateResult<()> {
        let ins = self.final_ins.as_mut().ok_or_else(|| {
            UpdateError::IllegalState(format!(
                "no final inserter for repository {}",
                self.repo.name()
            ))
        })?;
        for obj in self.temp_ins.inserted_objects() {
            ins.insert(obj.object())?;
        }
        self.temp_ins.clear();
        Ok(())
    }

    /// Release the repository handle if this context opened it. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.owned {
            if let Some(ins) = self.final_ins.as_mut() {
                ins.close();
            }
            self.repo.close();
            debug!(repo = %self.repo.name(), "closed repository");
        }
    }
}

impl Drop for OpenRepo {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for OpenRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRepo")
            .field("repo", &self.repo.name())
            .field("temp_ins", &self.temp_ins)
            .field("cmds", &self.cmds)
            .field("owned", &self.owned)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use notedb_refs::{InMemoryRepoManager, ReceiveCommand};
    use notedb_store::{Blob, ObjectStore, StoreInserter};

    fn project() -> ProjectName {
        ProjectName::new("demo").unwrap()
    }

    fn blob(data: &[u8]) -> notedb_store::StoredObject {
        Blob::new(data.to_vec()).to_stored_object()
    }

    #[test]
    fn owned_context_closes_once() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project()).unwrap();
        let mut or = OpenRepo::open(&manager, &project()).unwrap();
        assert!(or.is_owned());
        assert_eq!(repo.open_handles(), 1);

        or.close();
        or.close();
        drop(or);
        assert_eq!(repo.open_handles(), 0);
    }

    #[test]
    fn dropping_closes_owned_context() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project()).unwrap();
        drop(OpenRepo::open(&manager, &project()).unwrap());
        assert_eq!(repo.open_handles(), 0);
    }

    #[test]
    fn external_context_is_left_open() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project()).unwrap();
        let handle = manager.open_repository(&project()).unwrap();
        let cmds = ChainedReceiveCommands::new(handle.clone());
        let mut or = OpenRepo::external(handle, None, cmds);
        or.close();
        assert_eq!(repo.open_handles(), 1);
    }

    #[test]
    fn flush_moves_objects_to_store() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project()).unwrap();
        let mut or = OpenRepo::open(&manager, &project()).unwrap();
        let id = or.temp_ins.insert(blob(b"note"));

        or.flush().unwrap();
        assert!(or.inserted_objects().is_empty());
        assert!(repo.objects().exists(&id).unwrap());
    }

    #[test]
    fn flush_to_final_inserter_does_not_write() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project()).unwrap();
        let handle = manager.open_repository(&project()).unwrap();
        let final_ins = Arc::new(Mutex::new(StoreInserter::new(handle.object_store())));
        let cmds = ChainedReceiveCommands::new(handle.clone());
        let mut or = OpenRepo::external(handle, Some(Box::new(final_ins.clone())), cmds);

        let id = or.temp_ins.insert(blob(b"note"));
        or.flush_to_final_inserter().unwrap();
        assert_eq!(final_ins.lock().unwrap().pending().len(), 1);
        assert!(!repo.objects().exists(&id).unwrap());
    }

    #[test]
    fn flush_without_final_inserter() {
        let repo = Arc::new(notedb_refs::InMemoryRepository::new(project()));
        let cmds = ChainedReceiveCommands::new(repo.clone());
        let mut or = OpenRepo::external(repo, None, cmds);
        assert!(matches!(or.flush(), Err(UpdateError::IllegalState(_))));
    }

    #[test]
    fn get_reflects_pending_commands() {
        let manager = InMemoryRepoManager::new();
        manager.create_repository(project()).unwrap();
        let mut or = OpenRepo::open(&manager, &project()).unwrap();
        let tip = ObjectId::from_bytes(b"tip");
        or.commands_mut()
            .add(ReceiveCommand::new(ObjectId::zero(), tip, "refs/changes/01/1/meta"))
            .unwrap();
        assert_eq!(or.get("refs/changes/01/1/meta").unwrap(), Some(tip));
    }
}
