//! Presence set and the single active chat session.
//!
//! The relay pushes complete online-user lists; the set is replaced
//! on every update, never diffed. At most one peer is "active" (the
//! conversation currently composed to and displayed). Presence loss
//! of the active peer disables composition but keeps the selection,
//! so the peer's return re-enables composition without re-selection.
//!
//! Invariant: composition is enabled iff an active peer is set *and*
//! that peer is in the presence set.

use std::collections::HashSet;

use whisperlink_types::{Result, Username, WhisperlinkError};

// ---------------------------------------------------------------------------
// Transition reports
// ---------------------------------------------------------------------------

/// Outcome of [`PresenceTracker::set_active`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Activation {
    /// The requested peer was already the active session; nothing
    /// changed and no replay is due.
    AlreadyActive,
    /// The session switched to the requested peer; the caller clears
    /// the displayed conversation and replays that peer's history.
    Activated,
}

/// Composition-relevant transition caused by a presence update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PresenceTransition {
    /// Composition state did not change.
    Unchanged,
    /// The active peer dropped out of the presence set; composition
    /// is now disabled (selection kept).
    ActivePeerLeft,
    /// The active peer reappeared; composition is re-enabled without
    /// requiring re-selection.
    ActivePeerReturned,
}

// ---------------------------------------------------------------------------
// PresenceTracker
// ---------------------------------------------------------------------------

/// Tracks who is online and which peer the session is focused on.
pub struct PresenceTracker {
    local_user: Username,
    online: HashSet<Username>,
    active: Option<Username>,
}

impl PresenceTracker {
    /// Creates a tracker with an empty presence set and no active
    /// session.
    pub fn new(local_user: Username) -> Self {
        Self {
            local_user,
            online: HashSet::new(),
            active: None,
        }
    }

    /// Selects `username` as the active chat session.
    ///
    /// No-op if that peer is already active. There is no presence
    /// precondition: an offline peer may be selected, with
    /// composition staying disabled until they appear.
    ///
    /// # Errors
    ///
    /// [`WhisperlinkError::InvalidPeer`] if `username` is the local
    /// user — the own name is never a selectable peer.
    pub fn set_active(&mut self, username: Username) -> Result<Activation> {
        if username == self.local_user {
            return Err(WhisperlinkError::InvalidPeer {
                reason: "cannot start a chat session with yourself".into(),
            });
        }

        if self.active.as_ref() == Some(&username) {
            return Ok(Activation::AlreadyActive);
        }

        tracing::info!(peer = %username, "active session switched");
        self.active = Some(username);
        Ok(Activation::Activated)
    }

    /// Replaces the presence set with `online` and reports the
    /// composition transition for the active peer, if any.
    pub fn on_presence_update(&mut self, online: Vec<Username>) -> PresenceTransition {
        let was_enabled = self.composition_enabled();
        self.online = online.into_iter().collect();
        let is_enabled = self.composition_enabled();

        match (was_enabled, is_enabled) {
            (true, false) => PresenceTransition::ActivePeerLeft,
            (false, true) => PresenceTransition::ActivePeerReturned,
            _ => PresenceTransition::Unchanged,
        }
    }

    /// Whether message composition is currently allowed: an active
    /// peer is selected and present in the online set.
    pub fn composition_enabled(&self) -> bool {
        match &self.active {
            Some(peer) => self.online.contains(peer),
            None => false,
        }
    }

    /// The currently selected peer, if any.
    pub fn active_peer(&self) -> Option<&Username> {
        self.active.as_ref()
    }

    /// Whether `username` is currently online.
    pub fn is_online(&self, username: &Username) -> bool {
        self.online.contains(username)
    }

    /// Number of users in the presence set (the local user counts if
    /// the relay lists it).
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Drops all presence state and the active selection (session
    /// teardown).
    pub fn clear(&mut self) {
        self.online.clear();
        self.active = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
