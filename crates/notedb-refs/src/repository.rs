//! Repository handles and the manager that opens them.
//!
//! A [`Repository`] pairs an object store with a ref database. Handles are
//! reference counted by [`RepoManager::open_repository`]; whoever opens a
//! handle is responsible for calling [`Repository::close`] exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use notedb_store::{InMemoryObjectStore, ObjectInserter, ObjectStore, StoreInserter};
use notedb_types::ProjectName;

use crate::error::{RefError, Result};
use crate::memory::InMemoryRefDatabase;
use crate::traits::RefDatabase;

/// An open repository: objects plus refs.
pub trait Repository: Send + Sync {
    fn name(&self) -> &ProjectName;

    fn object_store(&self) -> Arc<dyn ObjectStore>;

    fn ref_database(&self) -> &dyn RefDatabase;

    /// A fresh inserter writing into this repository's object store.
    fn new_object_inserter(&self) -> Box<dyn ObjectInserter> {
        Box::new(StoreInserter::new(self.object_store()))
    }

    /// Release one handle obtained from [`RepoManager::open_repository`].
    fn close(&self);
}

/// Opens repositories by project name.
pub trait RepoManager: Send + Sync {
    fn open_repository(&self, name: &ProjectName) -> Result<Arc<dyn Repository>>;
}

/// Repository held entirely in memory.
pub struct InMemoryRepository {
    name: ProjectName,
    objects: Arc<InMemoryObjectStore>,
    refs: InMemoryRefDatabase,
    open_handles: AtomicUsize,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new(name: ProjectName) -> Self {
        Self::with_sequence(name, Arc::new(AtomicU64::new(0)))
    }

    fn with_sequence(name: ProjectName, batch_seq: Arc<AtomicU64>) -> Self {
        Self {
            name,
            objects: Arc::new(InMemoryObjectStore::new()),
            refs: InMemoryRefDatabase::with_sequence(batch_seq),
            open_handles: AtomicUsize::new(0),
        }
    }

    pub fn objects(&self) -> &InMemoryObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &InMemoryRefDatabase {
        &self.refs
    }

    /// Handles opened through a manager and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
    }
}

impl Repository for InMemoryRepository {
    fn name(&self) -> &ProjectName {
        &self.name
    }

    fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }

    fn ref_database(&self) -> &dyn RefDatabase {
        &self.refs
    }

    fn close(&self) {
        let _ = self
            .open_handles
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("name", &self.name)
            .field("open_handles", &self.open_handles())
            .finish()
    }
}

/// Manager over a fixed set of in-memory repositories.
///
/// All repositories share one batch sequence counter, so reflog entries can
/// be ordered across repositories.
#[derive(Default)]
pub struct InMemoryRepoManager {
    repos: RwLock<HashMap<ProjectName, Arc<InMemoryRepository>>>,
    batch_seq: Arc<AtomicU64>,
}

impl InMemoryRepoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository named `name`.
    pub fn create_repository(&self, name: ProjectName) -> Result<Arc<InMemoryRepository>> {
        let mut repos = self.repos.write().unwrap_or_else(PoisonError::into_inner);
        if repos.contains_key(&name) {
            return Err(RefError::RepositoryExists(name.to_string()));
        }
        let repo = Arc::new(InMemoryRepository::with_sequence(
            name.clone(),
            self.batch_seq.clone(),
        ));
        repos.insert(name, repo.clone());
        Ok(repo)
    }

    /// The repository named `name`, without opening a handle.
    pub fn get(&self, name: &ProjectName) -> Option<Arc<InMemoryRepository>> {
        let repos = self.repos.read().unwrap_or_else(PoisonError::into_inner);
        repos.get(name).cloned()
    }
}

impl RepoManager for InMemoryRepoManager {
    fn open_repository(&self, name: &ProjectName) -> Result<Arc<dyn Repository>> {
        let repo = self
            .get(name)
            .ok_or_else(|| RefError::RepositoryNotFound(name.to_string()))?;
        repo.acquire();
        debug!(repo = %name, handles = repo.open_handles(), "opened repository");
        Ok(repo as Arc<dyn Repository>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notedb_store::Blob;

    fn project(name: &str) -> ProjectName {
        ProjectName::new(name).unwrap()
    }

    #[test]
    fn open_and_close_track_handles() {
        let manager = InMemoryRepoManager::new();
        let repo = manager.create_repository(project("demo")).unwrap();

        let h1 = manager.open_repository(&project("demo")).unwrap();
        let h2 = manager.open_repository(&project("demo")).unwrap();
        assert_eq!(repo.open_handles(), 2);

        h1.close();
        h2.close();
        assert_eq!(repo.open_handles(), 0);

        // Closing more often than opening does not underflow.
        repo.close();
        assert_eq!(repo.open_handles(), 0);
    }

    #[test]
    fn unknown_repository() {
        let manager = InMemoryRepoManager::new();
        let err = manager.open_repository(&project("missing")).err().unwrap();
        assert!(matches!(err, RefError::RepositoryNotFound(name) if name == "missing"));
    }

    #[test]
    fn duplicate_repository() {
        let manager = InMemoryRepoManager::new();
        manager.create_repository(project("demo")).unwrap();
        assert!(matches!(
            manager.create_repository(project("demo")),
            Err(RefError::RepositoryExists(_))
        ));
    }

    #[test]
    fn inserter_writes_into_repository() {
        let repo = InMemoryRepository::new(project("demo"));
        let mut ins = repo.new_object_inserter();
        let id = ins
            .insert(&Blob::new(b"data".to_vec()).to_stored_object())
            .unwrap();
        assert!(!repo.objects().exists(&id).unwrap());
        ins.flush().unwrap();
        assert!(repo.objects().exists(&id).unwrap());
    }
}
