//! In-memory ref database for testing and ephemeral use.
//!
//! [`InMemoryRefDatabase`] keeps refs in a `BTreeMap` behind a `RwLock` and
//! applies batches under a single write lock, so an atomic batch is seen by
//! readers either entirely or not at all.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use notedb_store::{is_ancestor, ObjectStore};
use notedb_types::{ObjectId, PersonIdent};

use crate::batch::BatchRefUpdate;
use crate::command::{CommandResult, ReceiveCommand};
use crate::error::Result;
use crate::names::validate_ref_name;
use crate::traits::RefDatabase;

/// One applied change to a ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflogEntry {
    pub old_id: ObjectId,
    pub new_id: ObjectId,
    pub who: Option<PersonIdent>,
    pub message: Option<String>,
    /// Sequence number of the batch that applied this entry. Shared across
    /// every database created with the same sequence counter.
    pub batch_seq: u64,
    /// Fingerprint of the push certificate key, if the batch carried one.
    pub push_cert_key: Option<String>,
}

#[derive(Default)]
struct RefState {
    refs: BTreeMap<String, ObjectId>,
    reflogs: HashMap<String, Vec<ReflogEntry>>,
}

/// An in-memory implementation of [`RefDatabase`].
pub struct InMemoryRefDatabase {
    state: RwLock<RefState>,
    atomic: AtomicBool,
    batch_seq: Arc<AtomicU64>,
    rejections: RwLock<HashMap<String, String>>,
}

impl InMemoryRefDatabase {
    /// Create an empty ref database with its own batch sequence.
    pub fn new() -> Self {
        Self::with_sequence(Arc::new(AtomicU64::new(0)))
    }

    /// Database whose batches draw sequence numbers from a shared counter,
    /// so batches across several databases can be ordered.
    pub fn with_sequence(batch_seq: Arc<AtomicU64>) -> Self {
        Self {
            state: RwLock::new(RefState::default()),
            atomic: AtomicBool::new(true),
            batch_seq,
            rejections: RwLock::new(HashMap::new()),
        }
    }

    /// Switch between all-or-nothing and per-command batch execution.
    pub fn set_atomic(&self, atomic: bool) {
        self.atomic.store(atomic, Ordering::SeqCst);
    }

    /// Point `name` at `id` outside of any batch, as another writer would.
    /// A zero `id` deletes the ref.
    pub fn set_ref(&self, name: &str, id: ObjectId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if id.is_zero() {
            state.refs.remove(name);
        } else {
            state.refs.insert(name.to_string(), id);
        }
    }

    /// Make every future command on `name` fail with `reason`, the way a
    /// broken or locked-down backend would.
    pub fn set_rejection(&self, name: &str, reason: &str) {
        self.rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), reason.to_string());
    }

    /// Undo every [`set_rejection`](Self::set_rejection).
    pub fn clear_rejections(&self) {
        self.rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Reflog of `name`, oldest entry first.
    pub fn reflog(&self, name: &str) -> Vec<ReflogEntry> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.reflogs.get(name).cloned().unwrap_or_default()
    }

    /// Snapshot of all refs.
    pub fn all_refs(&self) -> BTreeMap<String, ObjectId> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.refs.clone()
    }

    fn check_command(
        refs: &BTreeMap<String, ObjectId>,
        cmd: &ReceiveCommand,
        allow_non_fast_forwards: bool,
        rejections: &HashMap<String, String>,
        objects: &dyn ObjectStore,
    ) -> Result<CommandResult> {
        if let Err(e) = validate_ref_name(cmd.ref_name()) {
            return Ok(CommandResult::Rejected(e.to_string()));
        }
        if let Some(reason) = rejections.get(cmd.ref_name()) {
            return Ok(CommandResult::Rejected(reason.clone()));
        }

        let current = refs.get(cmd.ref_name()).copied().unwrap_or_default();
        if current != cmd.old_id() {
            return Ok(CommandResult::LockFailure);
        }

        let new_id = cmd.new_id();
        if !new_id.is_zero() {
            if !objects.exists(&new_id)? {
                return Ok(CommandResult::Rejected(format!("missing object {new_id}")));
            }
            let old_id = cmd.old_id();
            if !allow_non_fast_forwards
                && !old_id.is_zero()
                && !is_ancestor(objects, &old_id, &new_id)?
            {
                return Ok(CommandResult::Rejected("non-fast-forward".into()));
            }
        }
        Ok(CommandResult::Ok)
    }
}

impl Default for InMemoryRefDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRefDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InMemoryRefDatabase")
            .field("ref_count", &state.refs.len())
            .field("atomic", &self.performs_atomic_transactions())
            .finish()
    }
}

impl RefDatabase for InMemoryRefDatabase {
    fn exact_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.refs.get(name).copied())
    }

    fn refs_by_prefix(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, id)| (name.clone(), *id))
            .collect())
    }

    fn performs_atomic_transactions(&self) -> bool {
        self.atomic.load(Ordering::SeqCst)
    }

    fn execute_batch(&self, batch: &mut BatchRefUpdate, objects: &dyn ObjectStore) -> Result<()> {
        if batch.commands().is_empty() {
            return Ok(());
        }
        let seq = self.batch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let atomic = batch.is_atomic() && self.performs_atomic_transactions();
        let allow_nff = batch.is_allow_non_fast_forwards();
        let message = batch.ref_log_message().map(str::to_owned);
        let who = batch.ref_log_ident().cloned();
        let (cert_ok, push_cert_key) = match batch.push_certificate() {
            Some(cert) => (cert.verify().is_ok(), Some(cert.key().fingerprint())),
            None => (true, None),
        };

        let rejections = self.rejections.read().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let mut seen = HashSet::new();
        let mut verdicts = Vec::with_capacity(batch.commands().len());
        for cmd in batch.commands() {
            let verdict = if !cert_ok {
                CommandResult::Rejected("invalid push certificate".into())
            } else if !seen.insert(cmd.ref_name().to_string()) {
                CommandResult::Rejected("duplicate ref update".into())
            } else {
                Self::check_command(&state.refs, cmd, allow_nff, &rejections, objects)?
            };
            verdicts.push(verdict);
        }

        if atomic && verdicts.iter().any(|v| !v.is_ok()) {
            for (cmd, verdict) in batch.commands_mut().iter_mut().zip(verdicts) {
                cmd.set_result(if verdict.is_ok() {
                    CommandResult::TransactionAborted
                } else {
                    verdict
                });
            }
            warn!(seq, commands = batch.commands().len(), "atomic ref batch aborted");
            return Ok(());
        }

        for (cmd, verdict) in batch.commands_mut().iter_mut().zip(verdicts) {
            if verdict.is_ok() {
                let name = cmd.ref_name().to_string();
                if cmd.new_id().is_zero() {
                    state.refs.remove(&name);
                } else {
                    state.refs.insert(name.clone(), cmd.new_id());
                }
                state.reflogs.entry(name).or_default().push(ReflogEntry {
                    old_id: cmd.old_id(),
                    new_id: cmd.new_id(),
                    who: who.clone(),
                    message: message.clone(),
                    batch_seq: seq,
                    push_cert_key: push_cert_key.clone(),
                });
            }
            cmd.set_result(verdict);
        }
        debug!(seq, commands = batch.commands().len(), atomic, "executed ref batch");
        Ok(())
    }
}
