//! vp_proto — Wire types, envelopes, and serialisation for Veilpost
//!
//! All on-wire types are JSON except the group message triplet, which
//! is colon-separated lowercase hex (bit-exact for interop).
//!
//! # Modules
//! - `payload`  — the closed tagged union carried inside envelopes
//! - `envelope` — encrypt-then-sign 1:1 envelope
//! - `wire`     — relay record shape + group AEAD triplet codec
//! - `group`    — persisted per-group protocol state
//! - `error`    — unified error type

pub mod envelope;
pub mod error;
pub mod group;
pub mod payload;
pub mod wire;

pub use envelope::Envelope;
pub use error::ProtoError;
pub use group::GroupState;
pub use payload::InnerPayload;
pub use wire::TransportRecord;
