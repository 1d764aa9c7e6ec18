//! Core shared types for the Whisperlink encrypted messaging client.
//!
//! This crate defines the types used across the workspace. No other
//! crate should define shared types — everything lives here.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Username
// ---------------------------------------------------------------------------

/// A user's display name, as attributed by the relay.
///
/// Usernames are the sole identity handle on the wire: the peer
/// directory, presence set, and history store are all keyed by
/// username. The relay attributes the `sender` field of every
/// delivered envelope, so clients never self-assert a name.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Creates a `Username` from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp carried in message envelopes.
///
/// Serialized as an RFC 3339 string on the wire. Envelope timestamps
/// are informational: history ordering follows arrival order on the
/// client's event queue, not envelope timestamps.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = WhisperlinkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| WhisperlinkError::Protocol {
                reason: format!("invalid RFC 3339 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Events emitted by the session event loop to the UI layer.
///
/// The consumer renders these; the session never touches a display
/// directly. Event-channel send failures are logged and swallowed so
/// a slow consumer cannot stall message processing.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// A decrypted message (or its failure sentinel) ready for display
    /// in the active conversation.
    MessageDisplayed {
        /// Peer the conversation belongs to.
        peer: Username,
        /// Author of the message.
        sender: Username,
        /// Recovered plaintext, or a decryption-failure sentinel.
        body: String,
        /// Whether the local user authored this message.
        own: bool,
        /// Envelope timestamp.
        timestamp: Timestamp,
    },

    /// A system notice (status text, offline warnings, new-message
    /// hints). Display-only, no state attached.
    SystemNotice {
        /// Notice text.
        text: String,
    },

    /// Message composition was enabled or disabled.
    ///
    /// Enabled iff a peer is selected and currently online.
    ComposerChanged {
        /// New composer state.
        enabled: bool,
    },

    /// The online-user set was replaced by a relay update.
    PresenceChanged {
        /// Complete new list of online usernames.
        online: Vec<Username>,
    },

    /// The displayed conversation was cleared because a (new) peer
    /// was selected. Replayed history follows as `MessageDisplayed`
    /// events.
    ConversationCleared {
        /// The newly selected peer.
        peer: Username,
    },
}

// ---------------------------------------------------------------------------
// WhisperlinkError
// ---------------------------------------------------------------------------

/// Central error type for the Whisperlink client.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum. Per-message decryption failures are *not*
/// errors — they degrade to a displayed sentinel (see the crypto
/// crate's `DecryptFailure`).
#[derive(Debug, Error)]
pub enum WhisperlinkError {
    /// Identity keypair generation failed. Fatal: no chat is possible
    /// without an identity, and the key size is never degraded.
    #[error("identity key generation failed: {reason}")]
    KeyGeneration {
        /// Description of the generation failure.
        reason: String,
    },

    /// No public key is known for the intended recipient. The send is
    /// blocked and nothing is queued.
    #[error("no public key known for '{username}'")]
    MissingPeerKey {
        /// The recipient whose key is missing.
        username: String,
    },

    /// The requested peer is not a valid target (the local user
    /// itself, no active selection, or an offline active peer).
    #[error("invalid peer: {reason}")]
    InvalidPeer {
        /// Description of why the peer is invalid.
        reason: String,
    },

    /// An encrypt-side cryptographic operation failed.
    #[error("crypto error: {reason}")]
    Crypto {
        /// Description of the cryptographic failure.
        reason: String,
    },

    /// A wire-level failure (serialization, or the relay channel
    /// closed underneath the session).
    #[error("protocol error: {reason}")]
    Protocol {
        /// Description of the protocol failure.
        reason: String,
    },

    /// A configuration value is invalid, or the session lifecycle was
    /// misused (double start, shutdown before start).
    #[error("config error: {reason}")]
    Config {
        /// Description of the configuration problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`WhisperlinkError`].
pub type Result<T> = std::result::Result<T, WhisperlinkError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
