//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a UTF-8 JSON object tagged by its `"type"` field.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::game::action::Selections;
use crate::game::state::MatchState;

// =============================================================================
// MESSAGE KINDS
// =============================================================================

/// Closed set of message kinds known to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Server: queued, waiting for an opponent.
    Waiting,
    /// Server: a match has begun.
    MatchStart,
    /// Server: full match snapshot.
    StateUpdate,
    /// Server: the player must choose.
    ActionRequest,
    /// Client: the player's choice.
    ActionResponse,
    /// Client: ask to be matched.
    MatchRequest,
    /// Server: application-level failure.
    Error,
}

/// Which side originates a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Server → client.
    Inbound,
    /// Client → server.
    Outbound,
}

impl MessageKind {
    /// All kinds.
    pub const ALL: [MessageKind; 7] = [
        MessageKind::Waiting,
        MessageKind::MatchStart,
        MessageKind::StateUpdate,
        MessageKind::ActionRequest,
        MessageKind::ActionResponse,
        MessageKind::MatchRequest,
        MessageKind::Error,
    ];

    /// Value of the `"type"` field.
    pub fn wire_name(self) -> &'static str {
        match self {
            MessageKind::Waiting => "waiting",
            MessageKind::MatchStart => "game_start",
            MessageKind::StateUpdate => "state_update",
            MessageKind::ActionRequest => "action_request",
            MessageKind::ActionResponse => "action_response",
            MessageKind::MatchRequest => "match_request",
            MessageKind::Error => "error",
        }
    }

    /// Parse a `"type"` value.
    pub fn from_wire(name: &str) -> Option<MessageKind> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    /// Originating side.
    pub fn direction(self) -> Direction {
        match self {
            MessageKind::ActionResponse | MessageKind::MatchRequest => Direction::Outbound,
            MessageKind::Waiting
            | MessageKind::MatchStart
            | MessageKind::StateUpdate
            | MessageKind::ActionRequest
            | MessageKind::Error => Direction::Inbound,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Waiting for an opponent.
    Waiting {
        /// Status text.
        message: String,
    },

    /// Match is starting.
    #[serde(rename = "game_start")]
    MatchStart {
        /// Game identifier.
        #[serde(default)]
        game_id: Option<String>,
        /// Server timestamp (ISO 8601).
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Full match snapshot.
    StateUpdate {
        /// Snapshot, replacing whatever the client holds.
        state: MatchState,
    },

    /// Decision prompt.
    ActionRequest {
        /// Prompt payload.
        data: ActionRequestData,
    },

    /// Application-level error.
    Error {
        /// Human-readable message.
        message: String,
    },

    /// Well-formed frame of a kind this client does not handle.
    #[serde(other)]
    Unhandled,
}

/// Payload of an `action_request`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionRequestData {
    /// Offered choices. JSON object keys are decimal strings.
    #[serde(deserialize_with = "decimal_keys")]
    pub selections: Selections,
}

/// Parse `{"0": "...", "1": "..."}` into integer-keyed selections.
///
/// Tagged-enum buffering hands map keys over as strings, so integer keys
/// are parsed here rather than by serde_json.
fn decimal_keys<'de, D>(deserializer: D) -> Result<Selections, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = std::collections::BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, description)| {
            key.trim()
                .parse::<u32>()
                .map(|index| (index, description))
                .map_err(|_| D::Error::custom(format!("selection key {:?} is not an index", key)))
        })
        .collect()
}

impl ServerMessage {
    /// Kind of this message, `None` for [`ServerMessage::Unhandled`].
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            ServerMessage::Waiting { .. } => Some(MessageKind::Waiting),
            ServerMessage::MatchStart { .. } => Some(MessageKind::MatchStart),
            ServerMessage::StateUpdate { .. } => Some(MessageKind::StateUpdate),
            ServerMessage::ActionRequest { .. } => Some(MessageKind::ActionRequest),
            ServerMessage::Error { .. } => Some(MessageKind::Error),
            ServerMessage::Unhandled => None,
        }
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        decode(s.as_bytes())
    }
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ask to be paired with an opponent.
    MatchRequest,
    /// Answer the outstanding prompt.
    ActionResponse {
        /// Chosen key of the prompt's selections.
        selected_index: u32,
    },
}

impl ClientMessage {
    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::MatchRequest => MessageKind::MatchRequest,
            ClientMessage::ActionResponse { .. } => MessageKind::ActionResponse,
        }
    }

    /// Wire representation.
    pub fn to_value(&self) -> Value {
        let kind = self.kind().wire_name();
        match self {
            ClientMessage::MatchRequest => json!({ "type": kind }),
            ClientMessage::ActionResponse { selected_index } => json!({
                "type": kind,
                "data": { "selected_index": selected_index },
            }),
        }
    }

    /// Serialize to JSON string.
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// A frame that could not be decoded. The frame is dropped; the
/// connection stays open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON.
    #[error("frame is not well-formed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// No string `"type"` field.
    #[error("frame has no message type")]
    MissingKind,

    /// Known kind, wrong fields.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Offending kind.
        kind: String,
        /// Field-level error.
        source: serde_json::Error,
    },
}

/// Decode one inbound frame.
///
/// Unknown but well-formed kinds decode to [`ServerMessage::Unhandled`].
pub fn decode(bytes: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let value: Value = serde_json::from_slice(bytes).map_err(ProtocolError::Malformed)?;

    let kind = match value.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(ProtocolError::MissingKind),
    };

    let message = ServerMessage::deserialize(value)
        .map_err(|source| ProtocolError::InvalidPayload {
            kind: kind.clone(),
            source,
        })?;

    if matches!(message, ServerMessage::Unhandled) {
        debug!("Ignoring unhandled message kind {:?}", kind);
    }

    Ok(message)
}
