//! Foundation types for NoteDb.
//!
//! NoteDb stores the review history of each change as a chain of commits in
//! the change's own repository, and each reviewer's unpublished drafts in a
//! shared `All-Users` repository. This crate holds the small value types every
//! other NoteDb crate shares.
//!
//! # Key Types
//!
//! - [`ObjectId`]: content-addressed id; the zero id means "no object"
//! - [`ChangeId`], [`AccountId`], [`ProjectName`]: entity identifiers
//! - [`PersonIdent`]: author/committer identity with timestamp
//! - [`refs`]: the ref name scheme for meta, robot-comment and draft refs

pub mod error;
pub mod ident;
pub mod ids;
pub mod object;
pub mod refs;

pub use error::TypeError;
pub use ident::{now_ms, PersonIdent};
pub use ids::{AccountId, ChangeId, ProjectName};
pub use object::ObjectId;
