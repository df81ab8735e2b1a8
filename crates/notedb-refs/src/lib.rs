//! Ref management for NoteDb repositories.
//!
//! Refs are the only mutable state of a repository: each one points at the
//! tip commit of an append-only history. This crate provides the write path
//! for refs and the repository handles that pair them with object storage.
//!
//! # Architecture
//!
//! - A [`ReceiveCommand`] is a compare-and-swap of one ref from an old id to a
//!   new id. Each command reports a [`CommandResult`] after execution.
//! - A [`BatchRefUpdate`] carries many commands plus reflog metadata and an
//!   optional [`PushCertificate`], and is executed in one call.
//! - A [`RefDatabase`] executes batches. [`InMemoryRefDatabase`] applies them
//!   atomically by default: if any command fails, the others report
//!   [`CommandResult::TransactionAborted`] and nothing changes.
//! - A [`Repository`] pairs a ref database with an object store;
//!   [`RepoManager`] opens repositories by project name.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`command`]: Ref commands and their results
//! - [`batch`]: Batch updates
//! - [`cert`]: Signed push certificates
//! - [`traits`]: The [`RefDatabase`] trait
//! - [`names`]: Ref name validation
//! - [`memory`]: In-memory [`InMemoryRefDatabase`]
//! - [`repository`]: Repository handles and managers

pub mod batch;
pub mod cert;
pub mod command;
pub mod error;
pub mod memory;
pub mod names;
pub mod repository;
pub mod traits;

pub use batch::BatchRefUpdate;
pub use cert::PushCertificate;
pub use command::{CommandResult, CommandType, ReceiveCommand};
pub use error::{RefError, Result};
pub use memory::{InMemoryRefDatabase, ReflogEntry};
pub use names::validate_ref_name;
pub use repository::{InMemoryRepoManager, InMemoryRepository, RepoManager, Repository};
pub use traits::RefDatabase;
