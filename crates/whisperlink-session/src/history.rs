//! Per-peer message archive.
//!
//! Stores every envelope that passes through the session — sent
//! echoes and received messages alike — keyed by "the other party"
//! so both directions of a conversation land in one sequence.
//! Envelopes are archived still encrypted; decryption is re-executed
//! on every replay and never cached, so an archive entry survives
//! even when its decryption fails today.
//!
//! Append-only, insertion-ordered (wall-clock arrival order on the
//! event queue), and scoped to the session lifetime: the store is
//! cleared at teardown, never persisted.

use std::collections::HashMap;

use whisperlink_protocol::envelope::MessageEnvelope;
use whisperlink_types::Username;

/// Username → ordered envelope sequence for all conversations.
#[derive(Default)]
pub struct HistoryStore {
    conversations: HashMap<Username, Vec<MessageEnvelope>>,
}

impl HistoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Archives `envelope` under its conversation peer — the
    /// recipient if the local user sent it, the sender otherwise.
    ///
    /// Returns the peer key the envelope was filed under.
    pub fn append(&mut self, local_user: &Username, envelope: MessageEnvelope) -> Username {
        let peer = envelope.peer_for(local_user).clone();
        self.conversations
            .entry(peer.clone())
            .or_default()
            .push(envelope);
        peer
    }

    /// The stored sequence for `peer`, in insertion order. Empty if
    /// no envelope has ever been archived for that peer.
    pub fn replay(&self, peer: &Username) -> &[MessageEnvelope] {
        self.conversations
            .get(peer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of peers with at least one archived envelope.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Number of envelopes archived for `peer`.
    pub fn message_count(&self, peer: &Username) -> usize {
        self.replay(peer).len()
    }

    /// Drops all conversations (session teardown).
    pub fn clear(&mut self) {
        self.conversations.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
