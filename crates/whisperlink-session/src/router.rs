//! Envelope classification: the routing dispatch table.
//!
//! Every envelope — inbound or the relay echo of an outbound send —
//! is classified by two facts: did the local user author it, and does
//! it belong to the currently active conversation?
//!
//! | own   | active session | envelope peer is active | action            |
//! |-------|----------------|-------------------------|-------------------|
//! | yes   | yes            | yes                     | display as own    |
//! | yes   | yes            | no                      | archive + notice  |
//! | yes   | no             | —                       | archive + notice  |
//! | no    | yes            | yes                     | display as peer   |
//! | no    | yes            | no                      | archive + notice  |
//! | no    | no             | —                       | archive + notice  |
//!
//! Classification is pure so the table is unit-testable without any
//! transport or channel machinery. Archiving itself is unconditional
//! and happens in the inbound handler, before classification is even
//! consulted.

use whisperlink_protocol::envelope::MessageEnvelope;
use whisperlink_types::Username;

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// User-facing hint emitted when an envelope is archived without
/// being displayed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    /// Own message was delivered while its conversation was not on
    /// screen.
    SentWhileAway {
        /// Recipient of the archived message.
        recipient: Username,
    },
    /// A peer's message arrived for a conversation that is not on
    /// screen.
    NewMessageFrom {
        /// Author of the archived message.
        sender: Username,
    },
}

impl Notice {
    /// Display text for this notice.
    pub fn text(&self) -> String {
        match self {
            Self::SentWhileAway { recipient } => {
                format!("Message sent to {recipient} (not currently shown).")
            }
            Self::NewMessageFrom { sender } => {
                format!("New message from {sender}! Select them to view.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RouteAction
// ---------------------------------------------------------------------------

/// What the inbound handler should do with an envelope, beyond the
/// unconditional archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RouteAction {
    /// Decrypt and display in the active conversation.
    Display {
        /// Whether the local user authored the message.
        own: bool,
    },
    /// Keep archived only, and surface a notice.
    Archive {
        /// The notice to emit.
        notice: Notice,
    },
}

/// Classifies an envelope against the dispatch table.
pub fn classify(
    envelope: &MessageEnvelope,
    local_user: &Username,
    active_peer: Option<&Username>,
) -> RouteAction {
    let own = &envelope.sender == local_user;
    let peer = envelope.peer_for(local_user);

    if active_peer == Some(peer) {
        return RouteAction::Display { own };
    }

    let notice = if own {
        Notice::SentWhileAway {
            recipient: envelope.recipient.clone(),
        }
    } else {
        Notice::NewMessageFrom {
            sender: envelope.sender.clone(),
        }
    };
    RouteAction::Archive { notice }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
