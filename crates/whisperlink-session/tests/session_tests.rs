//! Integration tests for the whisperlink-session runtime.
//!
//! Each test drives a real session through its channels, with the
//! test body playing the relay: it reads `ClientRequest`s from the
//! client's outbound channel and delivers `RelayEvent`s inbound.
//! Because the event loop processes one event at a time and both
//! channels are FIFO, every test serializes its stimuli by awaiting
//! an observable effect (a client event or a command reply) before
//! sending the next one.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use whisperlink_crypto::hybrid::seal_for_peer;
use whisperlink_crypto::identity::{Identity, PeerPublicKey};
use whisperlink_protocol::envelope::MessageEnvelope;
use whisperlink_protocol::wire::{ClientRequest, RelayEvent};
use whisperlink_session::command::{SessionCommand, SessionStatus};
use whisperlink_session::session::Session;
use whisperlink_types::config::SessionConfig;
use whisperlink_types::{ClientEvent, Timestamp, Username, WhisperlinkError};

/// Upper bound for any single await in these tests.
const WAIT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A running session plus the relay's view of it.
struct Harness {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<ClientEvent>,
    relay_inbox: mpsc::Receiver<ClientRequest>,
    relay_outbox: mpsc::Sender<RelayEvent>,
    handle: JoinHandle<()>,
    /// PEM the session announced during registration.
    local_pem: String,
    // Keeps the command channel's peer alive for the loop's lifetime.
    _session: Session,
}

/// Starts a session for `local` and consumes its key registration.
async fn connect(local: &str) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();

    let (client_tx, mut relay_inbox) = mpsc::channel(32);
    let (relay_outbox, relay_rx) = mpsc::channel(32);

    let mut session = Session::new(
        SessionConfig::new(Username::new(local)),
        client_tx,
        relay_rx,
    )
    .expect("session creation");

    let commands = session.command_sender();
    let events = session.take_event_receiver().expect("event receiver");
    let handle = session.start().expect("session start");

    // The very first request is always the key announcement.
    let local_pem = match recv_request(&mut relay_inbox).await {
        ClientRequest::RegisterPublicKey { public_key } => public_key,
        other => panic!("expected key registration, got {other:?}"),
    };

    Harness {
        commands,
        events,
        relay_inbox,
        relay_outbox,
        handle,
        local_pem,
        _session: session,
    }
}

async fn recv_request(rx: &mut mpsc::Receiver<ClientRequest>) -> ClientRequest {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for client request")
        .expect("relay inbox closed")
}

async fn recv_event(rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("event channel closed")
}

impl Harness {
    async fn deliver(&self, event: RelayEvent) {
        self.relay_outbox.send(event).await.expect("deliver");
    }

    /// Delivers a presence update and waits for the corresponding
    /// `PresenceChanged` event — the barrier ensuring all previously
    /// delivered relay events were processed.
    async fn deliver_presence(&mut self, online: &[&str]) {
        let list: Vec<Username> = online.iter().map(|n| Username::new(*n)).collect();
        self.deliver(RelayEvent::UserListUpdate(list.clone())).await;
        match recv_event(&mut self.events).await {
            ClientEvent::PresenceChanged { online } => assert_eq!(online, list),
            other => panic!("expected PresenceChanged, got {other:?}"),
        }
    }

    async fn select_peer(&self, name: &str) -> Result<(), WhisperlinkError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::SelectPeer {
                username: Username::new(name),
                reply,
            })
            .await
            .expect("command send");
        timeout(WAIT, rx).await.expect("timed out").expect("reply")
    }

    /// Selects `name` and drains the three activation events
    /// (conversation cleared, notice, composer), asserting the
    /// composer state.
    async fn select_peer_ok(&mut self, name: &str, composer_enabled: bool) {
        self.select_peer(name).await.expect("select peer");

        match recv_event(&mut self.events).await {
            ClientEvent::ConversationCleared { peer } => {
                assert_eq!(peer, Username::new(name));
            }
            other => panic!("expected ConversationCleared, got {other:?}"),
        }
        match recv_event(&mut self.events).await {
            ClientEvent::SystemNotice { text } => {
                assert_eq!(text, format!("You are now chatting securely with {name}."));
            }
            other => panic!("expected SystemNotice, got {other:?}"),
        }
        match recv_event(&mut self.events).await {
            ClientEvent::ComposerChanged { enabled } => {
                assert_eq!(enabled, composer_enabled);
            }
            other => panic!("expected ComposerChanged, got {other:?}"),
        }
    }

    async fn send_text(&self, text: &str) -> Result<(), WhisperlinkError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::SendMessage {
                text: text.to_string(),
                reply,
            })
            .await
            .expect("command send");
        timeout(WAIT, rx).await.expect("timed out").expect("reply")
    }

    async fn status(&self) -> SessionStatus {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::GetStatus { reply })
            .await
            .expect("command send");
        timeout(WAIT, rx).await.expect("timed out").expect("reply")
    }
}

/// An envelope a remote peer would produce: plaintext sealed for the
/// given recipient key.
fn envelope_from(sender: &str, recipient: &str, recipient_pem: &str, text: &str) -> MessageEnvelope {
    let key = PeerPublicKey::from_pem(recipient_pem).expect("recipient pem");
    let sealed = seal_for_peer(text, &key).expect("seal");
    MessageEnvelope {
        sender: Username::new(sender),
        recipient: Username::new(recipient),
        ciphertext: sealed.ciphertext,
        iv: sealed.iv,
        encrypted_symmetric_key: sealed.encrypted_symmetric_key,
        timestamp: Timestamp::now(),
    }
}

// ---------------------------------------------------------------------------
// 1. Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_announces_parseable_public_key() {
    let harness = connect("alice").await;
    assert!(harness.local_pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    PeerPublicKey::from_pem(&harness.local_pem).expect("announced PEM must parse");
}

// ---------------------------------------------------------------------------
// 2. Full round trip: send, echo, display as own
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sent_message_echo_displays_as_own() {
    let mut harness = connect("alice").await;

    // The test relay hands "bob" the same key material alice just
    // announced, so the echoed envelope (wrapped for bob) opens with
    // alice's private key. This keeps the whole round trip observable
    // without running a second client.
    let pem = harness.local_pem.clone();
    harness
        .deliver(RelayEvent::PublicKeysExchange(
            [(Username::new("bob"), pem)].into_iter().collect(),
        ))
        .await;
    harness.deliver_presence(&["alice", "bob"]).await;

    harness.select_peer_ok("bob", true).await;

    harness.send_text("hello").await.expect("send");

    // The relay receives the outgoing shape (no sender attributed).
    let outgoing = match recv_request(&mut harness.relay_inbox).await {
        ClientRequest::SendMessage(outgoing) => outgoing,
        other => panic!("expected SendMessage, got {other:?}"),
    };
    assert_eq!(outgoing.recipient, Username::new("bob"));

    // Echo it back with the sender attributed, as the relay does.
    harness
        .deliver(RelayEvent::NewMessage(
            outgoing.into_envelope(Username::new("alice")),
        ))
        .await;

    match recv_event(&mut harness.events).await {
        ClientEvent::MessageDisplayed {
            peer,
            sender,
            body,
            own,
            ..
        } => {
            assert_eq!(peer, Username::new("bob"));
            assert_eq!(sender, Username::new("alice"));
            assert_eq!(body, "hello");
            assert!(own, "echoed send must display as own message");
        }
        other => panic!("expected MessageDisplayed, got {other:?}"),
    }

    let status = harness.status().await;
    assert_eq!(status.archived_conversations, 1);
    assert_eq!(status.known_keys, 1);
}

// ---------------------------------------------------------------------------
// 3. Archive without display, then replay on selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inactive_message_is_archived_and_replayed_on_select() {
    let mut harness = connect("alice").await;

    // A message from carol arrives with no session active.
    let envelope = envelope_from("carol", "alice", &harness.local_pem, "psst");
    harness.deliver(RelayEvent::NewMessage(envelope)).await;

    match recv_event(&mut harness.events).await {
        ClientEvent::SystemNotice { text } => {
            assert_eq!(text, "New message from carol! Select them to view.");
        }
        other => panic!("expected SystemNotice, got {other:?}"),
    }

    // Selecting carol (who is offline: composition stays disabled)
    // replays the archived conversation with lazy re-decryption.
    harness.select_peer_ok("carol", false).await;

    match recv_event(&mut harness.events).await {
        ClientEvent::MessageDisplayed {
            peer, body, own, ..
        } => {
            assert_eq!(peer, Username::new("carol"));
            assert_eq!(body, "psst");
            assert!(!own);
        }
        other => panic!("expected replayed MessageDisplayed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 4. Presence edge: leave disables, return re-enables
// ---------------------------------------------------------------------------

#[tokio::test]
async fn presence_loss_disables_composition_until_peer_returns() {
    let mut harness = connect("alice").await;

    harness.deliver_presence(&["alice", "bob"]).await;
    harness.select_peer_ok("bob", true).await;

    // Bob drops out of the presence set.
    harness.deliver_presence(&["alice"]).await;
    match recv_event(&mut harness.events).await {
        ClientEvent::SystemNotice { text } => assert_eq!(text, "bob went offline."),
        other => panic!("expected SystemNotice, got {other:?}"),
    }
    match recv_event(&mut harness.events).await {
        ClientEvent::ComposerChanged { enabled } => assert!(!enabled),
        other => panic!("expected ComposerChanged, got {other:?}"),
    }

    let status = harness.status().await;
    assert!(!status.composition_enabled);
    assert_eq!(status.active_peer, Some(Username::new("bob")), "selection kept");

    // Bob returns: composition re-enabled without re-selection.
    harness.deliver_presence(&["alice", "bob"]).await;
    match recv_event(&mut harness.events).await {
        ClientEvent::ComposerChanged { enabled } => assert!(enabled),
        other => panic!("expected ComposerChanged, got {other:?}"),
    }

    let status = harness.status().await;
    assert!(status.composition_enabled);
}

// ---------------------------------------------------------------------------
// 5. Blocked sends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_without_peer_key_is_blocked_and_notified() {
    let mut harness = connect("alice").await;

    harness.deliver_presence(&["alice", "bob"]).await;
    harness.select_peer_ok("bob", true).await;

    // Online but keyless: the send is blocked, nothing is queued.
    let result = harness.send_text("hi bob").await;
    assert!(matches!(
        result,
        Err(WhisperlinkError::MissingPeerKey { ref username }) if username == "bob"
    ));

    match recv_event(&mut harness.events).await {
        ClientEvent::SystemNotice { text } => {
            assert_eq!(text, "Public key for bob not found. Message not sent.");
        }
        other => panic!("expected SystemNotice, got {other:?}"),
    }

    // Barrier, then confirm nothing reached the relay.
    let _ = harness.status().await;
    assert!(
        harness.relay_inbox.try_recv().is_err(),
        "no request may reach the relay for a blocked send"
    );
}

#[tokio::test]
async fn send_without_active_session_rejected() {
    let harness = connect("alice").await;
    let result = harness.send_text("into the void").await;
    assert!(matches!(result, Err(WhisperlinkError::InvalidPeer { .. })));
}

#[tokio::test]
async fn send_to_offline_peer_rejected() {
    let mut harness = connect("alice").await;
    harness.select_peer_ok("bob", false).await;

    let result = harness.send_text("anyone there?").await;
    assert!(matches!(result, Err(WhisperlinkError::InvalidPeer { .. })));
}

#[tokio::test]
async fn selecting_self_rejected() {
    let harness = connect("alice").await;
    let result = harness.select_peer("alice").await;
    assert!(matches!(result, Err(WhisperlinkError::InvalidPeer { .. })));
}

// ---------------------------------------------------------------------------
// 6. Key directory over the wire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn announced_key_overwrites_exchange_key() {
    let mut harness = connect("alice").await;

    // Seed bob with a key alice cannot decrypt under…
    let unrelated = Identity::generate().expect("identity");
    let unrelated_pem = unrelated.public_key_pem().expect("pem");
    harness
        .deliver(RelayEvent::PublicKeysExchange(
            [(Username::new("bob"), unrelated_pem)].into_iter().collect(),
        ))
        .await;

    // …then announce a replacement (last write wins).
    harness
        .deliver(RelayEvent::NewPublicKey {
            username: Username::new("bob"),
            public_key: harness.local_pem.clone(),
        })
        .await;

    harness.deliver_presence(&["alice", "bob"]).await;
    harness.select_peer_ok("bob", true).await;
    harness.send_text("after rekey").await.expect("send");

    let outgoing = match recv_request(&mut harness.relay_inbox).await {
        ClientRequest::SendMessage(outgoing) => outgoing,
        other => panic!("expected SendMessage, got {other:?}"),
    };
    harness
        .deliver(RelayEvent::NewMessage(
            outgoing.into_envelope(Username::new("alice")),
        ))
        .await;

    // Decryptable ⇒ the announcement really replaced the seed key.
    match recv_event(&mut harness.events).await {
        ClientEvent::MessageDisplayed { body, .. } => assert_eq!(body, "after rekey"),
        other => panic!("expected MessageDisplayed, got {other:?}"),
    }
}

#[tokio::test]
async fn echo_wrapped_for_foreign_key_shows_sentinel() {
    let mut harness = connect("alice").await;

    // Bob gets a genuinely distinct keypair: the echo of alice's send
    // is wrapped for bob and alice's unwrap must fail — displayed as
    // the sentinel, but archived all the same.
    let bob = Identity::generate().expect("identity");
    let bob_pem = bob.public_key_pem().expect("pem");
    harness
        .deliver(RelayEvent::PublicKeysExchange(
            [(Username::new("bob"), bob_pem)].into_iter().collect(),
        ))
        .await;
    harness.deliver_presence(&["alice", "bob"]).await;
    harness.select_peer_ok("bob", true).await;

    harness.send_text("secret").await.expect("send");
    let outgoing = match recv_request(&mut harness.relay_inbox).await {
        ClientRequest::SendMessage(outgoing) => outgoing,
        other => panic!("expected SendMessage, got {other:?}"),
    };

    // Bob himself could read it.
    let opened = whisperlink_crypto::hybrid::open_sealed(
        &outgoing.ciphertext,
        &outgoing.iv,
        &outgoing.encrypted_symmetric_key,
        &bob,
    );
    assert_eq!(opened.as_deref(), Ok("secret"));

    harness
        .deliver(RelayEvent::NewMessage(
            outgoing.into_envelope(Username::new("alice")),
        ))
        .await;

    match recv_event(&mut harness.events).await {
        ClientEvent::MessageDisplayed { body, own, .. } => {
            assert!(own);
            assert_eq!(body, "[decryption failed: key unwrap]");
        }
        other => panic!("expected MessageDisplayed, got {other:?}"),
    }

    let status = harness.status().await;
    assert_eq!(status.archived_conversations, 1);
}

// ---------------------------------------------------------------------------
// 7. Status text and teardown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_message_is_display_only() {
    let mut harness = connect("alice").await;

    harness
        .deliver(RelayEvent::StatusMessage {
            text: "relay maintenance at midnight".into(),
        })
        .await;

    match recv_event(&mut harness.events).await {
        ClientEvent::SystemNotice { text } => {
            assert_eq!(text, "relay maintenance at midnight");
        }
        other => panic!("expected SystemNotice, got {other:?}"),
    }

    let status = harness.status().await;
    assert_eq!(status.online_count, 0, "status text must not change state");
    assert_eq!(status.known_keys, 0);
}

#[tokio::test]
async fn shutdown_command_ends_event_loop() {
    let harness = connect("alice").await;
    harness
        .commands
        .send(SessionCommand::Shutdown)
        .await
        .expect("command send");
    timeout(WAIT, harness.handle)
        .await
        .expect("loop did not exit")
        .expect("join");
}

#[tokio::test]
async fn relay_disconnect_ends_event_loop() {
    let harness = connect("alice").await;
    let Harness {
        relay_outbox,
        handle,
        ..
    } = harness;
    drop(relay_outbox);
    timeout(WAIT, handle)
        .await
        .expect("loop did not exit")
        .expect("join");
}
