//! Peer public key directory.
//!
//! Maps usernames to their announced (and already parsed) RSA public
//! keys. Two mutation paths exist: the bulk snapshot received once
//! per connection, and incremental single-peer announcements. Both
//! are last-write-wins — a later announcement for the same username
//! overwrites the stored key unconditionally, with no staleness or
//! version check.
//!
//! Entries are never deleted implicitly: presence and key material
//! are independent facts. A peer may go offline and return with the
//! same key, or announce a new one.

use std::collections::HashMap;

use whisperlink_crypto::identity::PeerPublicKey;
use whisperlink_types::Username;

/// Username → public key mapping for all known peers.
pub struct PeerDirectory {
    local_user: Username,
    entries: HashMap<Username, PeerPublicKey>,
}

impl PeerDirectory {
    /// Creates an empty directory. The local user's own entries are
    /// always skipped on insert.
    pub fn new(local_user: Username) -> Self {
        Self {
            local_user,
            entries: HashMap::new(),
        }
    }

    /// Inserts the initial directory snapshot, skipping the local
    /// user's own entry. Returns the number of entries stored.
    pub fn bulk_insert(
        &mut self,
        entries: impl IntoIterator<Item = (Username, PeerPublicKey)>,
    ) -> usize {
        let before = self.entries.len();
        for (username, key) in entries {
            self.upsert(username, key);
        }
        self.entries.len() - before
    }

    /// Stores or overwrites the key for `username` (last-write-wins).
    ///
    /// An announcement for the local user is ignored: a client never
    /// needs its own public key in the peer directory.
    pub fn upsert(&mut self, username: Username, key: PeerPublicKey) {
        if username == self.local_user {
            tracing::debug!(%username, "ignoring key announcement for local user");
            return;
        }
        self.entries.insert(username, key);
    }

    /// Looks up the stored key for `username`.
    pub fn lookup(&self, username: &Username) -> Option<&PeerPublicKey> {
        self.entries.get(username)
    }

    /// Number of peers with a known key.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no peer keys are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries (session teardown).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
