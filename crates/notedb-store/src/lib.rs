//! Content-addressed object storage for NoteDb.
//!
//! Every piece of change metadata is stored as an immutable object identified
//! by the domain-separated BLAKE3 hash of its bytes. New history only ever adds
//! objects; refs are the only mutable pointers and live in `notedb-refs`.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content
//! - [`CommitObject`] -- one node of a ref's history, with parent links
//!
//! # Writers
//!
//! - [`ObjectStore`] is the durable store; [`InMemoryObjectStore`] backs tests
//!   and embedding.
//! - [`ObjectInserter`] buffers writes until `flush`; [`StoreInserter`] is the
//!   inserter for any [`ObjectStore`].

pub mod error;
pub mod inserter;
pub mod memory;
pub mod object;
pub mod traits;
pub mod walk;

pub use error::{StoreError, StoreResult};
pub use inserter::StoreInserter;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, CommitObject, ObjectKind, StoredObject};
pub use traits::{ObjectInserter, ObjectStore};
pub use walk::{is_ancestor, read_commit};
