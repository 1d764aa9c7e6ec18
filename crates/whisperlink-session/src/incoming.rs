//! Inbound message processing.
//!
//! Handles every `new_message` delivery from the relay, including the
//! echo of the local user's own sends. The handler:
//!
//! 1. **Archives the envelope — always, and first.** History must be
//!    complete regardless of which session is active at arrival time,
//!    and archiving must never depend on successful decryption.
//! 2. Classifies the envelope against the routing table.
//! 3. Either decrypts for display (substituting the failure sentinel
//!    if the envelope will not open) or emits an archive notice.
//!
//! Decryption failures are per-message and recoverable: the sentinel
//! text is displayed and the loop continues with the next event.

use tokio::sync::mpsc;

use whisperlink_crypto::hybrid::open_sealed;
use whisperlink_crypto::identity::Identity;
use whisperlink_protocol::envelope::MessageEnvelope;
use whisperlink_types::{ClientEvent, Username};

use crate::history::HistoryStore;
use crate::router::{classify, RouteAction};

// ---------------------------------------------------------------------------
// Event emission
// ---------------------------------------------------------------------------

/// Sends a [`ClientEvent`] to the UI channel.
///
/// Send failures are logged, never propagated: the event loop must
/// not crash because a consumer fell behind or dropped the receiver.
pub(crate) async fn send_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    if event_tx.send(event).await.is_err() {
        tracing::warn!("client event channel closed -- consumer may have dropped");
    }
}

// ---------------------------------------------------------------------------
// Decrypt-for-display
// ---------------------------------------------------------------------------

/// Decrypts an envelope for display, degrading to the failure
/// sentinel instead of erroring.
///
/// Used on fresh arrivals and on every history replay alike —
/// results are never cached, so replay re-decrypts with whatever key
/// material is currently held (always the session's private key).
pub(crate) fn decrypt_for_display(envelope: &MessageEnvelope, identity: &Identity) -> String {
    match open_sealed(
        &envelope.ciphertext,
        &envelope.iv,
        &envelope.encrypted_symmetric_key,
        identity,
    ) {
        Ok(plaintext) => plaintext,
        Err(failure) => {
            tracing::warn!(
                sender = %envelope.sender,
                %failure,
                "message failed to decrypt; displaying sentinel"
            );
            failure.sentinel().to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Processes one relayed envelope: archive, classify, display or
/// notify.
pub(crate) async fn handle_new_message(
    envelope: MessageEnvelope,
    local_user: &Username,
    active_peer: Option<&Username>,
    history: &mut HistoryStore,
    identity: &Identity,
    event_tx: &mpsc::Sender<ClientEvent>,
) {
    // 1. Archive first, before any decryption is attempted.
    let peer = history.append(local_user, envelope.clone());

    tracing::debug!(
        sender = %envelope.sender,
        %peer,
        "envelope archived"
    );

    // 2. Classify against the dispatch table.
    let action = classify(&envelope, local_user, active_peer);

    // 3. Display in the active conversation, or notify.
    match action {
        RouteAction::Display { own } => {
            let body = decrypt_for_display(&envelope, identity);
            send_event(
                event_tx,
                ClientEvent::MessageDisplayed {
                    peer,
                    sender: envelope.sender,
                    body,
                    own,
                    timestamp: envelope.timestamp,
                },
            )
            .await;
        }
        RouteAction::Archive { notice } => {
            send_event(
                event_tx,
                ClientEvent::SystemNotice {
                    text: notice.text(),
                },
            )
            .await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
