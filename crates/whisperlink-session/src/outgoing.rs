//! Outbound message construction.
//!
//! Builds the client→relay shape of a message:
//!
//! 1. Look up the recipient's public key in the peer directory.
//! 2. Seal the plaintext (fresh symmetric key + RSA key wrap).
//! 3. Stamp the current time.
//!
//! The caller (event loop) submits the result to the relay channel.
//! Nothing is archived or displayed here: the relay echoes every
//! accepted send back to its author, and the echo drives the
//! history/display pipeline like any other inbound envelope.

use whisperlink_crypto::hybrid::seal_for_peer;
use whisperlink_protocol::envelope::OutgoingMessage;
use whisperlink_types::{Result, Timestamp, Username, WhisperlinkError};

use crate::directory::PeerDirectory;

/// Builds an [`OutgoingMessage`] for the given recipient.
///
/// # Errors
///
/// - [`WhisperlinkError::MissingPeerKey`] if no public key is known
///   for `recipient`. The send is blocked; nothing is queued.
/// - [`WhisperlinkError::Crypto`] if sealing fails.
pub fn build_outgoing_message(
    plaintext: &str,
    recipient: &Username,
    directory: &PeerDirectory,
) -> Result<OutgoingMessage> {
    // 1. Recipient key lookup.
    let recipient_key =
        directory
            .lookup(recipient)
            .ok_or_else(|| WhisperlinkError::MissingPeerKey {
                username: recipient.to_string(),
            })?;

    // 2. Per-message hybrid encryption.
    let sealed = seal_for_peer(plaintext, recipient_key)?;

    // 3. Assemble the wire shape (the relay attributes the sender).
    Ok(OutgoingMessage {
        recipient: recipient.clone(),
        encrypted_symmetric_key: sealed.encrypted_symmetric_key,
        iv: sealed.iv,
        ciphertext: sealed.ciphertext,
        timestamp: Timestamp::now(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
