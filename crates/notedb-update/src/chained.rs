//! Pending ref commands layered over a repository's durable refs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use notedb_refs::{BatchRefUpdate, CommandResult, ReceiveCommand, Repository};
use notedb_types::ObjectId;

use crate::error::{UpdateError, UpdateResult};

/// Caches durable ref lookups for the lifetime of a staging pass.
pub struct RepoRefCache {
    repo: Arc<dyn Repository>,
    ids: HashMap<String, Option<ObjectId>>,
}

impl RepoRefCache {
    /// Cache over `repo`'s ref database.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            ids: HashMap::new(),
        }
    }

    /// Tip of `ref_name`, reading the database only on the first lookup.
    pub fn get(&mut self, ref_name: &str) -> UpdateResult<Option<ObjectId>> {
        if let Some(id) = self.ids.get(ref_name) {
            return Ok(*id);
        }
        let id = self.repo.ref_database().exact_ref(ref_name)?;
        self.ids.insert(ref_name.to_string(), id);
        Ok(id)
    }
}

/// A set of ref commands where later commands on the same ref chain onto
/// earlier ones.
///
/// Adding `B -> C` after `A -> B` leaves a single `A -> C` command, so the
/// batch sent to the ref database holds at most one command per ref and
/// [`get`](Self::get) always answers with the tip the pending commands would
/// produce.
pub struct ChainedReceiveCommands {
    commands: BTreeMap<String, ReceiveCommand>,
    ref_cache: RepoRefCache,
}

impl ChainedReceiveCommands {
    /// Empty command set over `repo`'s refs.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            commands: BTreeMap::new(),
            ref_cache: RepoRefCache::new(repo),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Pending commands, sorted by ref name.
    pub fn commands(&self) -> impl Iterator<Item = &ReceiveCommand> {
        self.commands.values()
    }

    /// Add a command, chaining it onto any pending command for the same ref.
    pub fn add(&mut self, cmd: ReceiveCommand) -> UpdateResult<()> {
        if cmd.old_id() == cmd.new_id() {
            return Err(UpdateError::InvalidArgument(format!(
                "ref update is a no-op: {cmd}"
            )));
        }
        let Some(pending) = self.commands.get(cmd.ref_name()) else {
            self.commands.insert(cmd.ref_name().to_string(), cmd);
            return Ok(());
        };
        if pending.result() != &CommandResult::NotAttempted {
            return Err(UpdateError::IllegalState(format!(
                "cannot chain ref update {cmd} after update {pending} with result {}",
                pending.result()
            )));
        }
        if pending.new_id() != cmd.old_id() {
            return Err(UpdateError::InvalidArgument(format!(
                "cannot chain ref update {cmd} after update {pending} with different new ID"
            )));
        }

        let old_id = pending.old_id();
        let ref_name = cmd.ref_name().to_string();
        if old_id == cmd.new_id() {
            // Back where the ref started.
            self.commands.remove(&ref_name);
        } else {
            let merged = ReceiveCommand::new(old_id, cmd.new_id(), ref_name.as_str());
            self.commands.insert(ref_name, merged);
        }
        Ok(())
    }

    /// Tip of `ref_name` after all pending commands; `None` if the ref does
    /// not exist or a pending command deletes it.
    pub fn get(&mut self, ref_name: &str) -> UpdateResult<Option<ObjectId>> {
        match self.commands.get(ref_name) {
            Some(cmd) => Ok(cmd.new_id().non_zero()),
            None => self.ref_cache.get(ref_name),
        }
    }

    /// Add every pending command to `bru`, in ref name order.
    pub fn add_to(&self, bru: &mut BatchRefUpdate) {
        for cmd in self.commands.values() {
            bru.add_command(cmd.clone());
        }
    }
}

impl std::fmt::Debug for ChainedReceiveCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.commands.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notedb_refs::InMemoryRepository;
    use notedb_types::ProjectName;

    fn id(s: &str) -> ObjectId {
        ObjectId::from_bytes(s.as_bytes())
    }

    fn repo() -> Arc<InMemoryRepository> {
        Arc::new(InMemoryRepository::new(ProjectName::new("demo").unwrap()))
    }

    const REF: &str = "refs/changes/01/1/meta";

    #[test]
    fn get_falls_back_to_durable_refs() {
        let repo = repo();
        repo.refs().set_ref(REF, id("a"));
        let mut cmds = ChainedReceiveCommands::new(repo.clone());
        assert_eq!(cmds.get(REF).unwrap(), Some(id("a")));
        assert_eq!(cmds.get("refs/changes/02/2/meta").unwrap(), None);

        cmds.add(ReceiveCommand::new(id("a"), id("b"), REF)).unwrap();
        assert_eq!(cmds.get(REF).unwrap(), Some(id("b")));
    }

    #[test]
    fn durable_reads_are_cached() {
        let repo = repo();
        repo.refs().set_ref(REF, id("a"));
        let mut cache = RepoRefCache::new(repo.clone());
        assert_eq!(cache.get(REF).unwrap(), Some(id("a")));
        repo.refs().set_ref(REF, id("moved"));
        assert_eq!(cache.get(REF).unwrap(), Some(id("a")));
    }

    #[test]
    fn chaining_merges_commands() {
        let mut cmds = ChainedReceiveCommands::new(repo());
        cmds.add(ReceiveCommand::new(ObjectId::zero(), id("a"), REF)).unwrap();
        cmds.add(ReceiveCommand::new(id("a"), id("b"), REF)).unwrap();

        let all: Vec<_> = cmds.commands().cloned().collect();
        assert_eq!(all, vec![ReceiveCommand::new(ObjectId::zero(), id("b"), REF)]);
    }

    #[test]
    fn chaining_back_to_start_drops_command() {
        let mut cmds = ChainedReceiveCommands::new(repo());
        cmds.add(ReceiveCommand::new(id("a"), id("b"), REF)).unwrap();
        cmds.add(ReceiveCommand::new(id("b"), id("a"), REF)).unwrap();
        assert!(cmds.is_empty());
    }

    #[test]
    fn deleted_ref_reads_as_absent() {
        let mut cmds = ChainedReceiveCommands::new(repo());
        cmds.add(ReceiveCommand::new(id("a"), ObjectId::zero(), REF)).unwrap();
        assert_eq!(cmds.get(REF).unwrap(), None);
    }

    #[test]
    fn rejects_no_op_and_broken_chain() {
        let mut cmds = ChainedReceiveCommands::new(repo());
        assert!(matches!(
            cmds.add(ReceiveCommand::new(id("a"), id("a"), REF)),
            Err(UpdateError::InvalidArgument(_))
        ));
        cmds.add(ReceiveCommand::new(id("a"), id("b"), REF)).unwrap();
        assert!(matches!(
            cmds.add(ReceiveCommand::new(id("x"), id("c"), REF)),
            Err(UpdateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn add_to_batch_in_ref_order() {
        let mut cmds = ChainedReceiveCommands::new(repo());
        cmds.add(ReceiveCommand::new(ObjectId::zero(), id("r"), "refs/changes/01/1/robot-comments"))
            .unwrap();
        cmds.add(ReceiveCommand::new(ObjectId::zero(), id("m"), REF)).unwrap();

        let mut bru = BatchRefUpdate::new(true);
        cmds.add_to(&mut bru);
        let names: Vec<_> = bru.commands().iter().map(|c| c.ref_name()).collect();
        assert_eq!(names, vec![REF, "refs/changes/01/1/robot-comments"]);
    }
}
