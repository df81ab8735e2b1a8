//! What a staging pass produced, and how commit results are classified.

use tracing::warn;

use notedb_refs::{BatchRefUpdate, CommandResult, ReceiveCommand};
use notedb_types::{refs, ChangeId};

use crate::error::{UpdateError, UpdateResult};
use crate::inserter::InsertedObject;
use crate::open_repo::OpenRepo;
use crate::state::{ChangeState, Delta};

/// Per-change view of a staging pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedResult {
    pub id: ChangeId,
    pub delta: Delta,
    /// Commands on this change's refs in the project repository.
    pub change_commands: Vec<ReceiveCommand>,
    /// Every object staged in the project repository.
    pub change_objects: Vec<InsertedObject>,
    /// Commands on this change's draft refs in All-Users.
    pub all_users_commands: Vec<ReceiveCommand>,
    pub all_users_objects: Vec<InsertedObject>,
}

impl StagedResult {
    pub(crate) fn create(
        id: ChangeId,
        delta: Delta,
        change_repo: &OpenRepo,
        all_users_repo: Option<&OpenRepo>,
    ) -> Self {
        let change_commands = change_repo
            .commands()
            .commands()
            .filter(|c| refs::change_id_from_ref(c.ref_name()) == Some(id))
            .cloned()
            .collect();
        let (all_users_commands, all_users_objects) = match all_users_repo {
            Some(or) => (
                or.commands()
                    .commands()
                    .filter(|c| refs::parse_draft_ref(c.ref_name()).map(|(c, _)| c) == Some(id))
                    .cloned()
                    .collect(),
                or.inserted_objects().to_vec(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            id,
            delta,
            change_commands,
            change_objects: change_repo.inserted_objects().to_vec(),
            all_users_commands,
            all_users_objects,
        }
    }
}

/// Result of [`stage_and_apply_delta`](crate::UpdateManager::stage_and_apply_delta).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageOutcome {
    /// `None` if nothing was staged for the change.
    pub staged: Option<StagedResult>,
    /// Pointer now stored on the change record.
    pub new_state: Option<ChangeState>,
}

/// Turn per-command results of an executed batch into an error.
///
/// A batch where every command lost a race (or was aborted because another
/// one did) is reported as [`UpdateError::LockFailure`], which callers may
/// retry. Any other failure is [`UpdateError::Storage`].
pub fn check_results(bru: &BatchRefUpdate) -> UpdateResult<()> {
    let total = bru.commands().len();
    let mut failed = 0;
    let mut contended = 0;
    for cmd in bru.commands() {
        match cmd.result() {
            CommandResult::Ok => continue,
            CommandResult::LockFailure | CommandResult::TransactionAborted => contended += 1,
            _ => {}
        }
        failed += 1;
    }
    if failed == 0 {
        return Ok(());
    }
    if contended == total {
        warn!(commands = total, "NoteDb update lost lock race");
        return Err(UpdateError::LockFailure(bru.to_string()));
    }
    warn!(commands = total, failed, "NoteDb update failed");
    Err(UpdateError::Storage(bru.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notedb_types::ObjectId;
    use proptest::prelude::*;

    fn batch(results: &[CommandResult]) -> BatchRefUpdate {
        let mut bru = BatchRefUpdate::new(true);
        for (i, r) in results.iter().enumerate() {
            let mut cmd = ReceiveCommand::new(
                ObjectId::zero(),
                ObjectId::from_bytes(&[i as u8]),
                format!("refs/changes/0{i}/{i}/meta"),
            );
            cmd.set_result(r.clone());
            bru.add_command(cmd);
        }
        bru
    }

    #[test]
    fn all_ok() {
        assert!(check_results(&batch(&[CommandResult::Ok, CommandResult::Ok])).is_ok());
        assert!(check_results(&batch(&[])).is_ok());
    }

    #[test]
    fn every_command_contended() {
        let bru = batch(&[
            CommandResult::LockFailure,
            CommandResult::LockFailure,
            CommandResult::LockFailure,
        ]);
        assert!(matches!(check_results(&bru), Err(UpdateError::LockFailure(_))));
    }

    #[test]
    fn lock_failure_and_aborts() {
        let bru = batch(&[
            CommandResult::LockFailure,
            CommandResult::TransactionAborted,
            CommandResult::TransactionAborted,
        ]);
        let err = check_results(&bru).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn partial_contention_is_storage_failure() {
        let bru = batch(&[CommandResult::LockFailure, CommandResult::Ok, CommandResult::Ok]);
        assert!(matches!(check_results(&bru), Err(UpdateError::Storage(_))));
    }

    #[test]
    fn rejection_is_storage_failure() {
        let bru = batch(&[CommandResult::Rejected("disk full".into())]);
        let err = check_results(&bru).unwrap_err();
        assert!(err.to_string().starts_with("Update failed: BatchRefUpdate["));
    }

    fn result_strategy() -> impl Strategy<Value = CommandResult> {
        prop_oneof![
            Just(CommandResult::Ok),
            Just(CommandResult::LockFailure),
            Just(CommandResult::TransactionAborted),
            Just(CommandResult::Rejected("io".into())),
        ]
    }

    proptest! {
        #[test]
        fn classification(results in proptest::collection::vec(result_strategy(), 0..8)) {
            let contended = results
                .iter()
                .filter(|r| matches!(r, CommandResult::LockFailure | CommandResult::TransactionAborted))
                .count();
            let ok = results.iter().filter(|r| r.is_ok()).count();
            let outcome = check_results(&batch(&results));
            if ok == results.len() {
                prop_assert!(outcome.is_ok());
            } else if contended == results.len() {
                prop_assert!(matches!(outcome, Err(UpdateError::LockFailure(_))));
            } else {
                prop_assert!(matches!(outcome, Err(UpdateError::Storage(_))));
            }
        }
    }
}
