//! Main event loop driving the session.
//!
//! [`run_event_loop`] is spawned as a tokio task by
//! [`Session::start`](crate::session::Session::start). It uses
//! `tokio::select!` to multiplex:
//!
//! 1. **Relay events** — directory snapshots, key announcements,
//!    presence updates, status text, and message deliveries.
//! 2. **Commands** — `SelectPeer`, `SendMessage`, `GetStatus`,
//!    `Shutdown` from the UI layer.
//! 3. **Shutdown signal** — graceful exit via `watch` channel.
//!
//! Every handler runs to completion before the next event is
//! processed, so envelopes are handled in arrival order and no state
//! needs locking. A closed relay channel counts as a disconnect and
//! ends the loop.

use whisperlink_crypto::identity::PeerPublicKey;
use whisperlink_protocol::wire::{ClientRequest, RelayEvent};
use whisperlink_types::{ClientEvent, Username, WhisperlinkError};

use crate::command::{SessionCommand, SessionStatus};
use crate::incoming::{self, decrypt_for_display, send_event};
use crate::outgoing;
use crate::presence::{Activation, PresenceTransition};
use crate::session::{SessionRuntime, SessionState};

/// Convenience alias.
type WResult<T> = std::result::Result<T, WhisperlinkError>;

// ---------------------------------------------------------------------------
// Event loop entry point
// ---------------------------------------------------------------------------

/// Runs the session event loop until shutdown or relay disconnect.
pub(crate) async fn run_event_loop(mut rt: SessionRuntime) {
    tracing::info!(user = %rt.local_user, "session event loop started");

    // Announce the local public key. Sent exactly once, before any
    // message can be sent or received.
    let pem = match rt.identity.public_key_pem() {
        Ok(pem) => pem,
        Err(e) => {
            tracing::error!(%e, "public key export failed -- session unusable");
            return;
        }
    };
    if rt
        .relay_tx
        .send(ClientRequest::RegisterPublicKey { public_key: pem })
        .await
        .is_err()
    {
        tracing::error!("relay channel closed before key registration");
        return;
    }
    tracing::debug!("public key registered with relay");

    loop {
        tokio::select! {
            // ---------------------------------------------------------------
            // 1. Relay events, in arrival order.
            // ---------------------------------------------------------------
            maybe_event = rt.relay_rx.recv() => {
                match maybe_event {
                    Some(event) => handle_relay_event(event, &mut rt).await,
                    None => {
                        tracing::info!("relay channel closed -- disconnecting");
                        send_event(
                            &rt.event_tx,
                            ClientEvent::SystemNotice {
                                text: "Disconnected from the relay.".into(),
                            },
                        )
                        .await;
                        send_event(&rt.event_tx, ClientEvent::ComposerChanged { enabled: false })
                            .await;
                        break;
                    }
                }
            }

            // ---------------------------------------------------------------
            // 2. Commands from the UI layer.
            // ---------------------------------------------------------------
            Some(cmd) = rt.command_rx.recv() => {
                let should_shutdown = handle_command(cmd, &mut rt).await;
                if should_shutdown {
                    tracing::info!("shutdown command received -- exiting event loop");
                    break;
                }
            }

            // ---------------------------------------------------------------
            // 3. Shutdown signal via watch channel.
            // ---------------------------------------------------------------
            _ = rt.shutdown_rx.changed() => {
                if *rt.shutdown_rx.borrow() {
                    tracing::info!("shutdown signal received -- exiting event loop");
                    break;
                }
            }
        }
    }

    shutdown_sequence(&mut rt);
    tracing::info!("session event loop exited");
}

// ---------------------------------------------------------------------------
// Relay event handler
// ---------------------------------------------------------------------------

/// Dispatches a relay event to the appropriate handler.
async fn handle_relay_event(event: RelayEvent, rt: &mut SessionRuntime) {
    match event {
        RelayEvent::PublicKeysExchange(snapshot) => {
            let mut parsed = Vec::with_capacity(snapshot.len());
            for (username, pem) in snapshot {
                if username == rt.local_user {
                    continue;
                }
                match PeerPublicKey::from_pem(&pem) {
                    Ok(key) => parsed.push((username, key)),
                    Err(e) => {
                        tracing::warn!(%username, %e, "ignoring unparseable key in exchange");
                    }
                }
            }
            let stored = rt.directory.bulk_insert(parsed);
            tracing::info!(count = stored, "peer directory seeded");
        }

        RelayEvent::NewPublicKey {
            username,
            public_key,
        } => match PeerPublicKey::from_pem(&public_key) {
            Ok(key) => {
                tracing::info!(%username, "peer key announced");
                rt.directory.upsert(username, key);
            }
            Err(e) => {
                tracing::warn!(%username, %e, "ignoring unparseable announced key");
            }
        },

        RelayEvent::UserListUpdate(online) => {
            let transition = rt.presence.on_presence_update(online.clone());
            tracing::debug!(online = online.len(), "presence set replaced");

            send_event(&rt.event_tx, ClientEvent::PresenceChanged { online }).await;

            match transition {
                PresenceTransition::ActivePeerLeft => {
                    if let Some(peer) = rt.presence.active_peer() {
                        send_event(
                            &rt.event_tx,
                            ClientEvent::SystemNotice {
                                text: format!("{peer} went offline."),
                            },
                        )
                        .await;
                    }
                    send_event(&rt.event_tx, ClientEvent::ComposerChanged { enabled: false })
                        .await;
                }
                PresenceTransition::ActivePeerReturned => {
                    send_event(&rt.event_tx, ClientEvent::ComposerChanged { enabled: true })
                        .await;
                }
                PresenceTransition::Unchanged => {}
            }
        }

        RelayEvent::StatusMessage { text } => {
            // Display-only; no state change.
            send_event(&rt.event_tx, ClientEvent::SystemNotice { text }).await;
        }

        RelayEvent::NewMessage(envelope) => {
            incoming::handle_new_message(
                envelope,
                &rt.local_user,
                rt.presence.active_peer(),
                &mut rt.history,
                &rt.identity,
                &rt.event_tx,
            )
            .await;
        }
    }
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

/// Processes a single command.
///
/// Returns `true` if the event loop should exit (shutdown command).
async fn handle_command(cmd: SessionCommand, rt: &mut SessionRuntime) -> bool {
    match cmd {
        SessionCommand::SelectPeer { username, reply } => {
            let result = select_peer(username, rt).await;
            let _ = reply.send(result);
            false
        }

        SessionCommand::SendMessage { text, reply } => {
            let result = send_message(&text, rt).await;

            // A missing key blocks the send and notifies the user.
            if let Err(WhisperlinkError::MissingPeerKey { username }) = &result {
                send_event(
                    &rt.event_tx,
                    ClientEvent::SystemNotice {
                        text: format!("Public key for {username} not found. Message not sent."),
                    },
                )
                .await;
            }

            let _ = reply.send(result);
            false
        }

        SessionCommand::GetStatus { reply } => {
            let _ = reply.send(build_status(rt));
            false
        }

        SessionCommand::Shutdown => true,
    }
}

/// Switches the active conversation and replays its history.
async fn select_peer(username: Username, rt: &mut SessionRuntime) -> WResult<()> {
    let activation = rt.presence.set_active(username.clone())?;
    if activation == Activation::AlreadyActive {
        return Ok(());
    }

    // Fresh conversation pane for the newly selected peer.
    send_event(
        &rt.event_tx,
        ClientEvent::ConversationCleared {
            peer: username.clone(),
        },
    )
    .await;
    send_event(
        &rt.event_tx,
        ClientEvent::SystemNotice {
            text: format!("You are now chatting securely with {username}."),
        },
    )
    .await;
    send_event(
        &rt.event_tx,
        ClientEvent::ComposerChanged {
            enabled: rt.presence.composition_enabled(),
        },
    )
    .await;

    // Replay the archived conversation, re-decrypting each envelope.
    let replayed = rt.history.replay(&username);
    tracing::debug!(peer = %username, count = replayed.len(), "replaying history");

    for envelope in replayed {
        let body = decrypt_for_display(envelope, &rt.identity);
        send_event(
            &rt.event_tx,
            ClientEvent::MessageDisplayed {
                peer: username.clone(),
                sender: envelope.sender.clone(),
                body,
                own: envelope.sender == rt.local_user,
                timestamp: envelope.timestamp.clone(),
            },
        )
        .await;
    }

    Ok(())
}

/// Encrypts and submits a message to the active peer.
///
/// Nothing is archived or displayed here — the relay echo is the
/// single path into history and display for sent messages.
async fn send_message(text: &str, rt: &mut SessionRuntime) -> WResult<()> {
    let peer = match rt.presence.active_peer() {
        Some(peer) => peer.clone(),
        None => {
            return Err(WhisperlinkError::InvalidPeer {
                reason: "no active chat session".into(),
            });
        }
    };

    if !rt.presence.composition_enabled() {
        return Err(WhisperlinkError::InvalidPeer {
            reason: format!("{peer} is offline"),
        });
    }

    let outgoing = outgoing::build_outgoing_message(text, &peer, &rt.directory)?;

    rt.relay_tx
        .send(ClientRequest::SendMessage(outgoing))
        .await
        .map_err(|_| WhisperlinkError::Protocol {
            reason: "relay channel closed".into(),
        })?;

    tracing::info!(%peer, "message submitted to relay");
    Ok(())
}

/// Builds a status snapshot of the session.
fn build_status(rt: &SessionRuntime) -> SessionStatus {
    SessionStatus {
        state: SessionState::Running,
        local_user: rt.local_user.clone(),
        active_peer: rt.presence.active_peer().cloned(),
        composition_enabled: rt.presence.composition_enabled(),
        online_count: rt.presence.online_count(),
        known_keys: rt.directory.len(),
        archived_conversations: rt.history.conversation_count(),
    }
}

// ---------------------------------------------------------------------------
// Shutdown sequence
// ---------------------------------------------------------------------------

/// Clears all session state. Identity, keys, presence, and history
/// live exactly as long as the session.
fn shutdown_sequence(rt: &mut SessionRuntime) {
    tracing::info!(
        conversations = rt.history.conversation_count(),
        known_keys = rt.directory.len(),
        "clearing session state"
    );

    rt.history.clear();
    rt.directory.clear();
    rt.presence.clear();
}
