//! Whisperlink session runtime.
//!
//! Owns all client-side chat state (identity, peer directory,
//! presence, history) and serializes every operation through a single
//! tokio event loop. External consumers drive the session with
//! [`command::SessionCommand`]s and observe it through
//! [`whisperlink_types::ClientEvent`]s; the relay boundary is a pair
//! of channels carrying typed wire events.
//!
//! # Modules
//!
//! - [`session`] — `Session` lifecycle (create, start, shutdown)
//! - [`event_loop`] — the `tokio::select!` loop over relay events,
//!   commands, and shutdown
//! - [`router`] — pure envelope classification (the dispatch table)
//! - [`incoming`] / [`outgoing`] — inbound archive-then-display
//!   handling and outbound envelope construction
//! - [`directory`] — username → public key mapping (last-write-wins)
//! - [`presence`] — online set and the single active chat session
//! - [`history`] — per-peer envelope archive with replay
//! - [`command`] — command and status types

pub mod command;
pub mod directory;
pub mod event_loop;
pub mod history;
pub mod incoming;
pub mod outgoing;
pub mod presence;
pub mod router;
pub mod session;
