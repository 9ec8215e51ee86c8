//! Network Layer
//!
//! WebSocket client for one game session.
//! Frames are decoded in `protocol`; only `session` mutates game state.

pub mod connection;
pub mod protocol;
pub mod session;

pub use connection::{Connection, ConnectionEvent, TransportError};
pub use protocol::{decode, ClientMessage, MessageKind, ProtocolError, ServerMessage};
pub use session::{Session, SessionError, SessionEvent, SessionState};
