//! Message envelopes: the unit of transport and of history storage.
//!
//! A [`MessageEnvelope`] is immutable once created. Its payload
//! fields (`ciphertext`, `iv`, `encryptedSymmetricKey`) are opaque
//! Base64 strings produced by the crypto crate; this crate never
//! inspects them.
//!
//! Clients send an [`OutgoingMessage`] (no sender field — the relay
//! attributes the sender) and receive full [`MessageEnvelope`]s,
//! including an echo of their own sends. The echo is how a sent
//! message enters the sender's history and display pipeline.

use serde::{Deserialize, Serialize};

use whisperlink_types::{Timestamp, Username};

// ---------------------------------------------------------------------------
// MessageEnvelope
// ---------------------------------------------------------------------------

/// A relayed message with full routing metadata.
///
/// Field names are camelCase on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Author, as attributed by the relay.
    pub sender: Username,
    /// Intended recipient.
    pub recipient: Username,
    /// Base64 AES-256-CBC ciphertext.
    pub ciphertext: String,
    /// Base64 16-byte IV.
    pub iv: String,
    /// Base64 RSA wrap of the per-message symmetric key.
    pub encrypted_symmetric_key: String,
    /// Creation time claimed by the sender.
    pub timestamp: Timestamp,
}

impl MessageEnvelope {
    /// The conversation partner from `local_user`'s point of view:
    /// the recipient for own messages, the sender otherwise.
    ///
    /// History is keyed by this value, so both directions of a
    /// conversation land in the same sequence.
    pub fn peer_for(&self, local_user: &Username) -> &Username {
        if &self.sender == local_user {
            &self.recipient
        } else {
            &self.sender
        }
    }
}

// ---------------------------------------------------------------------------
// OutgoingMessage
// ---------------------------------------------------------------------------

/// The client→relay shape of a message: an envelope without the
/// sender, which the relay attributes on delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Intended recipient.
    pub recipient: Username,
    /// Base64 RSA wrap of the per-message symmetric key.
    pub encrypted_symmetric_key: String,
    /// Base64 16-byte IV.
    pub iv: String,
    /// Base64 AES-256-CBC ciphertext.
    pub ciphertext: String,
    /// Creation time.
    pub timestamp: Timestamp,
}

impl OutgoingMessage {
    /// Attributes a sender, as the relay does when delivering or
    /// echoing the message.
    pub fn into_envelope(self, sender: Username) -> MessageEnvelope {
        MessageEnvelope {
            sender,
            recipient: self.recipient,
            ciphertext: self.ciphertext,
            iv: self.iv,
            encrypted_symmetric_key: self.encrypted_symmetric_key,
            timestamp: self.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
