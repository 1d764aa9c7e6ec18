//! Commands and status types for external → session communication.
//!
//! [`SessionCommand`] is the bounded-channel message type that UI
//! layers and tests use to drive the session. Each command that
//! produces a result carries a `tokio::sync::oneshot::Sender` for the
//! reply.
//!
//! All commands are processed sequentially inside the event loop,
//! eliminating races between concurrent callers.

use tokio::sync::oneshot;

use whisperlink_types::Username;

use crate::session::SessionState;

/// Convenience alias to avoid shadowing `std::result::Result`.
type WResult<T> = std::result::Result<T, whisperlink_types::WhisperlinkError>;

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// Commands accepted by the session event loop.
pub enum SessionCommand {
    /// Select `username` as the active chat session. Clears the
    /// displayed conversation and replays that peer's history.
    SelectPeer {
        /// The peer to activate.
        username: Username,
        /// Reply channel. `InvalidPeer` if the local user selects
        /// themselves.
        reply: oneshot::Sender<WResult<()>>,
    },

    /// Encrypt and submit a message to the active peer.
    ///
    /// Nothing is displayed on success: the relay echo drives the
    /// display pipeline. On failure nothing is queued.
    SendMessage {
        /// Plaintext to encrypt and send.
        text: String,
        /// Reply channel. `InvalidPeer` without an online active
        /// peer, `MissingPeerKey` if their key is unknown.
        reply: oneshot::Sender<WResult<()>>,
    },

    /// Query a snapshot of the session state.
    GetStatus {
        /// Reply channel for the snapshot.
        reply: oneshot::Sender<SessionStatus>,
    },

    /// Initiate graceful shutdown. Fire-and-forget; await the
    /// `JoinHandle` returned by `Session::start` for completion.
    Shutdown,
}

// Manual Debug because oneshot::Sender does not implement Debug.
impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectPeer { username, .. } => f
                .debug_struct("SelectPeer")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::SendMessage { text, .. } => f
                .debug_struct("SendMessage")
                .field("len", &text.len())
                .finish_non_exhaustive(),
            Self::GetStatus { .. } => f.write_str("GetStatus"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Snapshot of the session's current state.
///
/// Returned by [`SessionCommand::GetStatus`]. All fields are cloned
/// from the runtime so the reply is self-contained.
#[derive(Clone, Debug)]
pub struct SessionStatus {
    /// Lifecycle state (always `Running` while the loop replies).
    pub state: SessionState,
    /// The local user's name.
    pub local_user: Username,
    /// The active peer, if one is selected.
    pub active_peer: Option<Username>,
    /// Whether message composition is currently enabled.
    pub composition_enabled: bool,
    /// Size of the current presence set.
    pub online_count: usize,
    /// Number of peers with a known public key.
    pub known_keys: usize,
    /// Number of conversations with archived envelopes.
    pub archived_conversations: usize,
}
