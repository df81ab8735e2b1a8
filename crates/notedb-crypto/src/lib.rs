//! Hashing and signing primitives for NoteDb.
//!
//! Provides the domain-separated BLAKE3 hasher that gives every stored object
//! its [`ObjectId`](notedb_types::ObjectId), and the Ed25519 keys used to sign
//! push certificates.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
