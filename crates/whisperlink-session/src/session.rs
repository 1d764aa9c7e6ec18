//! Session lifecycle and state machine.
//!
//! The [`Session`] is the public entry point for the client runtime.
//! It owns all chat state and exposes a channel-based API to external
//! consumers (UI, tests).
//!
//! # State machine
//!
//! ```text
//! Initializing ──start()──▶ Running ──shutdown()──▶ ShuttingDown ──▶ (dropped)
//! ```
//!
//! - `Initializing` — identity generated, channels wired, loop not
//!   yet running.
//! - `Running` — event loop active, processing relay events and
//!   commands.
//! - `ShuttingDown` — teardown in progress; all session state
//!   (directory, presence, history) is cleared, never persisted.
//!
//! Double-start and shutdown-from-initializing are rejected with
//! [`WhisperlinkError::Config`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use whisperlink_crypto::identity::Identity;
use whisperlink_protocol::wire::{ClientRequest, RelayEvent};
use whisperlink_types::config::SessionConfig;
use whisperlink_types::{ClientEvent, Result, Username, WhisperlinkError};

use crate::command::SessionCommand;
use crate::directory::PeerDirectory;
use crate::event_loop;
use crate::history::HistoryStore;
use crate::presence::PresenceTracker;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Identity generated, event loop not started.
    Initializing,
    /// Event loop is active.
    Running,
    /// Graceful teardown in progress.
    ShuttingDown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRuntime (internal)
// ---------------------------------------------------------------------------

/// Owned runtime state moved into the event loop task.
///
/// Not exported — only [`Session`] and the event loop access this.
/// Single ownership is the whole concurrency story: every read and
/// write of directory, presence, and history happens on one task.
pub(crate) struct SessionRuntime {
    pub identity: Identity,
    pub local_user: Username,
    pub directory: PeerDirectory,
    pub presence: PresenceTracker,
    pub history: HistoryStore,
    pub relay_tx: mpsc::Sender<ClientRequest>,
    pub relay_rx: mpsc::Receiver<RelayEvent>,
    pub event_tx: mpsc::Sender<ClientEvent>,
    pub command_rx: mpsc::Receiver<SessionCommand>,
    pub shutdown_rx: watch::Receiver<bool>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Whisperlink client session — owns all chat state and drives the
/// event loop.
///
/// After construction via [`Session::new`], call [`Session::start`]
/// to spawn the event loop. Interact through the channels:
///
/// - Send [`SessionCommand`]s via [`Session::command_sender`].
/// - Receive [`ClientEvent`]s via [`Session::take_event_receiver`].
/// - Shut down via [`SessionCommand::Shutdown`] or
///   [`Session::shutdown`].
pub struct Session {
    /// Current lifecycle state.
    state: SessionState,

    /// Components to be moved into the event loop. `None` after
    /// `start()` has been called.
    runtime: Option<SessionRuntime>,

    /// Sender for commands to the event loop.
    command_tx: mpsc::Sender<SessionCommand>,

    /// Receiver for events from the event loop.
    /// `None` after taken by the consumer.
    event_rx: Option<mpsc::Receiver<ClientEvent>>,

    /// Signals the event loop to shut down.
    shutdown_tx: watch::Sender<bool>,
}

impl Session {
    /// Creates a new session and generates its identity keypair.
    ///
    /// `relay_tx`/`relay_rx` are the two halves of the relay
    /// boundary: everything the client sends goes out on `relay_tx`,
    /// everything the relay delivers arrives on `relay_rx`. What
    /// transport sits behind them is out of scope.
    ///
    /// # Errors
    ///
    /// - [`WhisperlinkError::Config`] if the configuration is invalid.
    /// - [`WhisperlinkError::KeyGeneration`] if the identity keypair
    ///   cannot be generated — fatal, no session exists without an
    ///   identity.
    pub fn new(
        config: SessionConfig,
        relay_tx: mpsc::Sender<ClientRequest>,
        relay_rx: mpsc::Receiver<RelayEvent>,
    ) -> Result<Self> {
        config.validate()?;

        // Identity first: key generation failure must surface before
        // any channel is handed out.
        let identity = Identity::generate()?;
        let local_user = config.local_user.clone();

        tracing::info!(user = %local_user, "session identity generated");

        let (command_tx, command_rx) = mpsc::channel(config.command_channel_size);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = SessionRuntime {
            identity,
            local_user: local_user.clone(),
            directory: PeerDirectory::new(local_user.clone()),
            presence: PresenceTracker::new(local_user),
            history: HistoryStore::new(),
            relay_tx,
            relay_rx,
            event_tx,
            command_rx,
            shutdown_rx,
        };

        Ok(Self {
            state: SessionState::Initializing,
            runtime: Some(runtime),
            command_tx,
            event_rx: Some(event_rx),
            shutdown_tx,
        })
    }

    /// Starts the event loop in a new tokio task.
    ///
    /// Transitions `Initializing → Running`. The returned
    /// `JoinHandle` resolves when the event loop exits.
    ///
    /// # Errors
    ///
    /// [`WhisperlinkError::Config`] if the session is not in
    /// `Initializing` state (prevents double-start).
    pub fn start(&mut self) -> Result<JoinHandle<()>> {
        if self.state != SessionState::Initializing {
            return Err(WhisperlinkError::Config {
                reason: format!(
                    "cannot start session in state '{}'; expected 'initializing'",
                    self.state,
                ),
            });
        }

        let runtime = self.runtime.take().ok_or_else(|| WhisperlinkError::Config {
            reason: "runtime already consumed (double start?)".into(),
        })?;

        let handle = tokio::spawn(async move {
            event_loop::run_event_loop(runtime).await;
        });

        self.state = SessionState::Running;
        Ok(handle)
    }

    /// Initiates graceful shutdown.
    ///
    /// Signals the event loop to exit; teardown clears all session
    /// state. Await the `JoinHandle` returned by
    /// [`start`](Self::start) for completion.
    ///
    /// # Errors
    ///
    /// [`WhisperlinkError::Config`] if the session has not been
    /// started (nothing to shut down).
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == SessionState::Initializing {
            return Err(WhisperlinkError::Config {
                reason: "cannot shutdown a session that has not been started".into(),
            });
        }

        if self.state == SessionState::ShuttingDown {
            // Already shutting down; idempotent.
            return Ok(());
        }

        self.state = SessionState::ShuttingDown;
        let _ = self.shutdown_tx.send(true);
        Ok(())
    }

    /// Returns a sender for submitting commands to the session.
    ///
    /// Cloneable — multiple UI handlers can hold copies.
    pub fn command_sender(&self) -> mpsc::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Takes the event receiver (can only be taken once).
    ///
    /// Returns `None` if already taken.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> (Session, mpsc::Receiver<ClientRequest>, mpsc::Sender<RelayEvent>) {
        let (relay_tx, relay_inbox) = mpsc::channel(16);
        let (relay_event_tx, relay_rx) = mpsc::channel(16);
        let session = Session::new(
            SessionConfig::new(Username::new("alice")),
            relay_tx,
            relay_rx,
        )
        .expect("session creation");
        (session, relay_inbox, relay_event_tx)
    }

    #[tokio::test]
    async fn lifecycle_happy_path() {
        let (mut session, _relay_inbox, _relay_event_tx) = test_session();
        assert_eq!(session.state(), SessionState::Initializing);

        let handle = session.start().expect("start");
        assert_eq!(session.state(), SessionState::Running);

        session.shutdown().expect("shutdown");
        assert_eq!(session.state(), SessionState::ShuttingDown);
        handle.await.expect("join");
    }

    #[tokio::test]
    async fn double_start_rejected() {
        let (mut session, _relay_inbox, _relay_event_tx) = test_session();
        let handle = session.start().expect("first start");

        assert!(session.start().is_err());

        session.shutdown().expect("shutdown");
        handle.await.expect("join");
    }

    #[tokio::test]
    async fn shutdown_before_start_rejected() {
        let (mut session, _relay_inbox, _relay_event_tx) = test_session();
        assert!(session.shutdown().is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (mut session, _relay_inbox, _relay_event_tx) = test_session();
        let handle = session.start().expect("start");

        session.shutdown().expect("first shutdown");
        session.shutdown().expect("second shutdown");
        handle.await.expect("join");
    }

    #[tokio::test]
    async fn event_receiver_taken_once() {
        let (mut session, _relay_inbox, _relay_event_tx) = test_session();
        assert!(session.take_event_receiver().is_some());
        assert!(session.take_event_receiver().is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let (relay_tx, _inbox) = mpsc::channel(16);
        let (_event_tx, relay_rx) = mpsc::channel(16);
        let result = Session::new(
            SessionConfig::new(Username::new("")),
            relay_tx,
            relay_rx,
        );
        assert!(matches!(result, Err(WhisperlinkError::Config { .. })));
    }
}
