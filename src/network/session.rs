//! Game Session
//!
//! Explicit per-session object owning the connection, the match-state
//! mirror and the action correlator. Connection events are handled one at
//! a time, in transport order, by [`Session::handle`]; that is the only
//! path that mutates match state or the pending prompt.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::game::action::{ActionCorrelator, PendingAction, RespondError, Selections, StaleActionError};
use crate::game::state::{GameStateModel, MatchState, Snapshot};
use crate::identity::SessionIdentity;
use crate::network::connection::{Connection, ConnectionEvent, TransportError};
use crate::network::protocol::{self, ClientMessage, ServerMessage};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handle exists, `Opened` not yet seen.
    Connecting,
    /// Connected; frames are being dispatched.
    Open,
    /// Connection closed. The session cannot be resumed.
    Closed,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport is up.
    Connected,
    /// Queued for a match.
    Waiting(String),
    /// A match has begun; previous state and prompt were dropped.
    MatchStarted {
        /// Game identifier, if the server sent one.
        game_id: Option<String>,
    },
    /// A new snapshot was applied. Redraw everything.
    StateChanged {
        /// Turn of the new snapshot.
        turn: u32,
    },
    /// The server is waiting for a choice.
    ActionPrompt(Selections),
    /// Application error reported by the server, verbatim.
    ServerError(String),
    /// Non-fatal transport problem.
    TransportNotice(String),
    /// An inbound frame could not be decoded and was dropped.
    FrameDiscarded(String),
    /// The session is over.
    Closed(String),
}

/// Session errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response does not match the current prompt.
    #[error("stale action: {0}")]
    StaleAction(#[from] StaleActionError),
}

impl From<RespondError> for SessionError {
    fn from(err: RespondError) -> Self {
        match err {
            RespondError::Stale(e) => SessionError::StaleAction(e),
            RespondError::Transport(e) => SessionError::Transport(e),
        }
    }
}

/// One player's session with the game server.
pub struct Session {
    state: SessionState,
    connection: Connection,
    model: GameStateModel,
    correlator: ActionCorrelator,
    game_id: Option<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Open a connection for `identity` and wrap it in a session.
    ///
    /// Feed the returned receiver to [`Session::run`] or [`Session::handle`].
    pub async fn connect(
        config: &ClientConfig,
        identity: &SessionIdentity,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>), SessionError> {
        let (connection, events) = Connection::open(config, identity).await?;
        Ok((Self::new(connection, config.event_capacity), events))
    }

    /// Wrap an existing connection.
    pub fn new(connection: Connection, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: SessionState::Connecting,
            connection,
            model: GameStateModel::new(),
            correlator: ActionCorrelator::new(),
            game_id: None,
            events,
        }
    }

    /// Subscribe to presentation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Observe snapshot replacements.
    pub fn watch_state(&self) -> watch::Receiver<Snapshot> {
        self.model.subscribe()
    }

    /// Current lifecycle state.
    pub fn session_state(&self) -> SessionState {
        self.state
    }

    /// Identity of this session.
    pub fn identity(&self) -> &SessionIdentity {
        self.connection.identity()
    }

    /// Current match id, if known.
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    /// Last mirrored snapshot.
    pub fn state(&self) -> Option<Arc<MatchState>> {
        self.model.current()
    }

    /// Outstanding prompt.
    pub fn pending(&self) -> Option<&PendingAction> {
        self.correlator.pending()
    }

    /// Ask the server for a match.
    pub fn request_match(&self) -> Result<(), SessionError> {
        self.connection.send(&ClientMessage::MatchRequest)?;
        info!("Match requested");
        Ok(())
    }

    /// Answer the outstanding prompt.
    ///
    /// Once the session is closing no prompt can be answered.
    pub fn respond(&mut self, index: u32) -> Result<(), SessionError> {
        if !self.connection.is_open() {
            self.correlator.discard();
            return Err(StaleActionError::NoPendingAction.into());
        }
        self.correlator.respond(index, &self.connection)?;
        Ok(())
    }

    /// End the session from the client side. The pending prompt is dropped
    /// immediately; the snapshot stays until `Closed` arrives.
    pub fn close(&mut self) {
        self.correlator.discard();
        self.connection.close();
    }

    /// Process connection events until the session closes.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<ConnectionEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle(event) == SessionState::Closed {
                return;
            }
        }
        if self.state != SessionState::Closed {
            self.handle(ConnectionEvent::Closed("event stream ended".to_string()));
        }
    }

    /// Process one connection event.
    pub fn handle(&mut self, event: ConnectionEvent) -> SessionState {
        match event {
            ConnectionEvent::Opened => {
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Open;
                    info!("Session {} connected", self.identity());
                    self.notify(SessionEvent::Connected);
                }
            }
            ConnectionEvent::Frame(bytes) => {
                if self.state == SessionState::Closed {
                    debug!("Dropping frame received after close");
                    return self.state;
                }
                match protocol::decode(&bytes) {
                    Ok(message) => self.dispatch(message),
                    Err(e) => {
                        warn!("Discarding frame: {}", e);
                        self.notify(SessionEvent::FrameDiscarded(e.to_string()));
                    }
                }
            }
            ConnectionEvent::TransportError(detail) => {
                warn!("Transport error: {}", detail);
                self.notify(SessionEvent::TransportNotice(detail));
            }
            ConnectionEvent::Closed(reason) => {
                if self.state != SessionState::Closed {
                    self.state = SessionState::Closed;
                    self.connection.mark_closed();
                    self.model.clear();
                    self.correlator.discard();
                    self.game_id = None;
                    info!("Session ended: {}", reason);
                    self.notify(SessionEvent::Closed(reason));
                }
            }
        }
        self.state
    }

    /// Route a decoded message to exactly one handler.
    fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Waiting { message } => {
                info!("Waiting: {}", message);
                self.notify(SessionEvent::Waiting(message));
            }
            ServerMessage::MatchStart { game_id, .. } => {
                info!("Match started: {}", game_id.as_deref().unwrap_or("<unnamed>"));
                self.model.clear();
                self.correlator.discard();
                self.game_id = game_id.clone();
                self.notify(SessionEvent::MatchStarted { game_id });
            }
            ServerMessage::StateUpdate { state } => {
                let snapshot = self.model.apply(state);
                self.notify(SessionEvent::StateChanged {
                    turn: snapshot.turn_number,
                });
            }
            ServerMessage::ActionRequest { data } => {
                let prompt = self.correlator.on_request(data.selections);
                debug!("Prompt {} with {} choices", prompt.prompt_id, prompt.selections().len());
                let selections = prompt.selections().clone();
                self.notify(SessionEvent::ActionPrompt(selections));
            }
            ServerMessage::Error { message } => {
                warn!("Server error: {}", message);
                self.notify(SessionEvent::ServerError(message));
            }
            ServerMessage::Unhandled => {}
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
