//! vp_store — group state persistence for Veilpost
//!
//! The protocol core never touches the filesystem directly: it is
//! handed a `GroupStore` capability (get/put/delete/list by group id)
//! and relies on two contract points:
//!
//! - `put` is atomic — a reader never observes a half-written state,
//!   and a failed put leaves the previous state authoritative.
//! - at most one process mutates a given store at a time; cross-process
//!   serialisation belongs to whoever owns the store file.
//!
//! Security-relevant mutations (ratchet advances, key rotations) are
//! persisted BEFORE the derived key material is used, so a crash
//! between derivation and send can never cause key reuse on retry.
//!
//! Two implementations: `MemoryStore` (tests, ephemeral) and
//! `SqliteStore` (WAL-mode SQLite; serialized state encrypted at rest
//! with a caller-supplied key).

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreKey};
pub use store::GroupStore;
