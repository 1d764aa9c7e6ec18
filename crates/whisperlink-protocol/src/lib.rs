//! Wire protocol for the Whisperlink client↔relay boundary.
//!
//! Defines the envelope shapes and the typed JSON events exchanged
//! with the relay. The relay itself is out of scope; only payload
//! shapes matter here.
//!
//! # Modules
//!
//! - [`envelope`] — `MessageEnvelope` and `OutgoingMessage` structs
//! - [`wire`] — `RelayEvent` (relay→client) and `ClientRequest`
//!   (client→relay) event enums

pub mod envelope;
pub mod wire;
