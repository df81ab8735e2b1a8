//! Transactional update coordinator for NoteDb.
//!
//! NoteDb keeps code-review state as commit histories under named refs. One
//! logical operation usually touches several refs in two repositories: the
//! change's `meta` and `robot-comments` refs in the project repository, and
//! per-reviewer draft refs in the shared All-Users repository. The
//! [`UpdateManager`] collects the producers for such an operation, stages
//! them into one chained command per ref, checks that nobody moved the refs
//! the caller based its work on, and commits the project batch before the
//! All-Users batch.
//!
//! ```no_run
//! use std::sync::Arc;
//! use notedb_refs::InMemoryRepoManager;
//! use notedb_types::{AccountId, ChangeId, PersonIdent, ProjectName};
//! use notedb_update::{ChangeRecord, ChangeUpdate, NoteDbConfig, UpdateManagerFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = Arc::new(InMemoryRepoManager::new());
//! let project = ProjectName::new("demo")?;
//! repos.create_repository(project.clone())?;
//! repos.create_repository(ProjectName::new("All-Users")?)?;
//!
//! let factory = UpdateManagerFactory::new(NoteDbConfig::default(), repos)?;
//! let mut manager = factory.create(project.clone());
//!
//! let change = ChangeRecord::new(ChangeId(1), project);
//! let mut update = ChangeUpdate::new(change, AccountId(1000), PersonIdent::now("Alice", "alice@example.com"));
//! update.set_allow_write_to_new_ref(true).set_subject("Create change");
//! manager.add(update)?;
//! manager.execute(false)?;
//! # Ok(())
//! # }
//! ```

pub mod chained;
pub mod config;
pub mod error;
pub mod inserter;
pub mod manager;
pub mod notes;
pub mod open_repo;
pub mod result;
pub mod state;
pub mod update;

pub use chained::{ChainedReceiveCommands, RepoRefCache};
pub use config::{NoteDbConfig, NotesMigration, ServerIdent};
pub use error::{NoteParseError, UpdateError, UpdateResult};
pub use inserter::{InMemoryInserter, InsertedObject};
pub use manager::{UpdateManager, UpdateManagerFactory};
pub use notes::{ChangeNote, Comment, DraftNote, RobotComment, RobotCommentNote};
pub use open_repo::OpenRepo;
pub use result::{check_results, StageOutcome, StagedResult};
pub use state::{ChangeRecord, ChangeState, Delta, PrimaryStorage, RefState};
pub use update::{
    ChangeDraftUpdate, ChangeUpdate, DeleteCommentRewriter, NoteDbUpdate, RewriteTarget,
    RobotCommentUpdate, UpdateKind,
};
