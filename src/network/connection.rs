//! WebSocket Connection
//!
//! One transport connection per session identity. A background task owns
//! the socket and multiplexes the outgoing queue with the inbound stream;
//! everything it observes is reported, in order, as [`ConnectionEvent`]s on
//! a single channel. There is no reconnection: once `Closed` is emitted the
//! connection is finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, error, info, instrument};

use crate::config::ClientConfig;
use crate::game::action::FrameSink;
use crate::identity::SessionIdentity;
use crate::network::protocol::ClientMessage;

/// Lifecycle and data events from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake completed. Always the first event.
    Opened,
    /// One inbound frame (text or binary payload).
    Frame(Vec<u8>),
    /// Transport-level failure report.
    TransportError(String),
    /// Connection finished. Always the last event.
    Closed(String),
}

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Handshake failed.
    #[error("failed to connect to {url}: {detail}")]
    Connect {
        /// Endpoint that was dialled.
        url: String,
        /// Underlying error text.
        detail: String,
    },

    /// Connection closed or never opened.
    #[error("connection is not open")]
    NotOpen,

    /// Outgoing queue is full.
    #[error("outgoing queue is full")]
    QueueFull,
}

/// Handle to a live connection.
///
/// Sending is fire-and-forget: `send` only queues, and delivery failures
/// arrive later as [`ConnectionEvent::TransportError`].
#[derive(Debug)]
pub struct Connection {
    identity: SessionIdentity,
    outgoing: mpsc::Sender<String>,
    open: Arc<AtomicBool>,
    // Separate from the frame queue so a full queue cannot block closing.
    closing: Arc<Notify>,
}

impl Connection {
    /// Connect to `<server_url>/<ws_prefix>/<identity>`.
    ///
    /// Callers must not open a second connection with the same identity
    /// while this one is live.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn open(
        config: &ClientConfig,
        identity: &SessionIdentity,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>), TransportError> {
        let url = config.ws_url(identity);
        info!("Connecting to {}...", url);

        let (ws_stream, _) = connect_async(url.as_str()).await.map_err(|e| {
            error!("Failed to connect to server: {}", e);
            TransportError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            }
        })?;
        info!("WebSocket connected!");

        let (outgoing_tx, outgoing_rx) = mpsc::channel(config.outgoing_capacity.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let open = Arc::new(AtomicBool::new(true));
        let closing = Arc::new(Notify::new());

        // Fresh channel with capacity >= 1, so this cannot block.
        let _ = event_tx.try_send(ConnectionEvent::Opened);
        tokio::spawn(drive_socket(
            ws_stream,
            outgoing_rx,
            Arc::clone(&closing),
            event_tx,
            Arc::clone(&open),
        ));

        Ok((
            Self {
                identity: identity.clone(),
                outgoing: outgoing_tx,
                open,
                closing,
            },
            event_rx,
        ))
    }

    /// Handle backed by a plain channel instead of a socket.
    #[cfg(test)]
    pub(crate) fn detached(identity: SessionIdentity, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outgoing, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                identity,
                outgoing,
                open: Arc::new(AtomicBool::new(true)),
                closing: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    /// Identity this connection is addressed as.
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Whether frames can still be queued.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a frame.
    pub fn send(&self, message: &ClientMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outgoing
            .try_send(message.encode())
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::QueueFull,
                TrySendError::Closed(_) => TransportError::NotOpen,
            })
    }

    /// Ask the socket task to close. Idempotent.
    ///
    /// Frames still queued may be dropped.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("Closing connection for {}", self.identity);
            // Stores a permit if the task is busy, so the request is never lost.
            self.closing.notify_one();
        }
    }

    /// Record that the transport reported `Closed`.
    pub(crate) fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl FrameSink for Connection {
    fn send(&self, message: &ClientMessage) -> Result<(), TransportError> {
        Connection::send(self, message)
    }
}

/// Socket task: forward inbound frames and write queued frames until
/// either side closes.
async fn drive_socket<S>(
    ws_stream: WebSocketStream<S>,
    mut outgoing: mpsc::Receiver<String>,
    closing: Arc<Notify>,
    events: mpsc::Sender<ConnectionEvent>,
    open: Arc<AtomicBool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            inbound = read.next() => {
                let payload = match inbound {
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Binary(data))) => data,
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.into_owned())
                            .filter(|reason| !reason.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("WebSocket read error: {}", e);
                        let _ = events.send(ConnectionEvent::TransportError(e.to_string())).await;
                        break e.to_string();
                    }
                    None => break "stream ended".to_string(),
                };
                if events.send(ConnectionEvent::Frame(payload)).await.is_err() {
                    break "session dropped".to_string();
                }
            }
            frame = outgoing.recv() => match frame {
                Some(json) => {
                    debug!("Sending: {}", json);
                    if let Err(e) = write.send(Message::Text(json)).await {
                        error!("Failed to send message: {}", e);
                        let _ = events.send(ConnectionEvent::TransportError(e.to_string())).await;
                        break e.to_string();
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break "closed by client".to_string();
                }
            },
            _ = closing.notified() => {
                let _ = write.send(Message::Close(None)).await;
                break "closed by client".to_string();
            }
        }
    };

    open.store(false, Ordering::SeqCst);
    info!("Connection closed: {}", reason);
    let _ = events.send(ConnectionEvent::Closed(reason)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn identity() -> SessionIdentity {
        SessionIdentity::parse("client_test").unwrap()
    }

    #[test]
    fn test_send_queues_encoded_frame() {
        let (conn, mut rx) = Connection::detached(identity(), 4);
        conn.send(&ClientMessage::MatchRequest).unwrap();
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"match_request"}"#);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (conn, mut rx) = Connection::detached(identity(), 4);
        conn.close();
        assert!(!conn.is_open());
        assert_eq!(conn.send(&ClientMessage::MatchRequest), Err(TransportError::NotOpen));
        assert!(rx.try_recv().is_err());

        // Exactly one close request reaches the socket task.
        conn.close();
        assert!(timeout(Duration::from_millis(100), conn.closing.notified()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), conn.closing.notified()).await.is_err());
    }

    #[tokio::test]
    async fn test_close_signalled_with_full_queue() {
        let (conn, _rx) = Connection::detached(identity(), 1);
        conn.send(&ClientMessage::MatchRequest).unwrap();
        assert_eq!(conn.send(&ClientMessage::MatchRequest), Err(TransportError::QueueFull));

        conn.close();
        assert!(timeout(Duration::from_millis(100), conn.closing.notified()).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_ends_socket_task() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Read until the client goes away.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let config = ClientConfig {
            server_url: format!("ws://{}", addr),
            outgoing_capacity: 1,
            ..Default::default()
        };
        let (conn, mut events) = Connection::open(&config, &identity()).await.unwrap();
        assert_eq!(events.recv().await, Some(ConnectionEvent::Opened));

        for _ in 0..4 {
            let _ = conn.send(&ClientMessage::MatchRequest);
        }
        conn.close();

        let closed = timeout(Duration::from_secs(5), async {
            while let Some(event) = events.recv().await {
                if let ConnectionEvent::Closed(reason) = event {
                    return reason;
                }
            }
            String::new()
        })
        .await
        .expect("socket task did not close");
        assert_eq!(closed, "closed by client");
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    }

    #[test]
    fn test_full_queue_reported() {
        let (conn, _rx) = Connection::detached(identity(), 1);
        conn.send(&ClientMessage::MatchRequest).unwrap();
        assert_eq!(conn.send(&ClientMessage::MatchRequest), Err(TransportError::QueueFull));
    }

    #[test]
    fn test_dropped_task_reads_as_not_open() {
        let (conn, rx) = Connection::detached(identity(), 1);
        drop(rx);
        assert_eq!(conn.send(&ClientMessage::MatchRequest), Err(TransportError::NotOpen));
    }

    #[tokio::test]
    async fn test_open_unreachable_server() {
        let config = ClientConfig {
            server_url: "ws://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let result = Connection::open(&config, &identity()).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
