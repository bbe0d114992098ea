//! vp_client — Veilpost protocol client core
//!
//! Glues the crypto, wire, and store layers into the operations a UI
//! calls: send/fetch 1:1 texts, create and message groups, leave, and
//! react to membership changes. Network and key-server access arrive
//! as injected capabilities ([`Transport`], [`Directory`]) so the core
//! stays transport-agnostic and fully testable in-process.

pub mod directory;
pub mod error;
pub mod groups;
pub mod messenger;
pub mod transport;

pub use directory::{Directory, DirectoryEntry, MemDirectory};
pub use error::ProtocolError;
pub use groups::{DistributionReport, GroupEvent};
pub use messenger::{IncomingText, Messenger};
pub use transport::{MemRelay, Transport};
