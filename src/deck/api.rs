//! Persistence Service Calls
//!
//! Describes the HTTP calls the deck screens make against the persistence
//! service. Nothing here performs I/O; a caller with an HTTP client turns a
//! [`DeckRequest`] into a request and feeds the body back to the parsers.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::validator::DeckPayload;
use crate::game::energy::EnergyType;
use crate::identity::SessionIdentity;

/// Cookie the service reads the session identity from.
pub const IDENTITY_COOKIE: &str = "client_id";

/// Starting rating of a new deck.
pub const DEFAULT_RATING: i64 = 1000;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl Method {
    /// Method token.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call to the persistence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckRequest {
    /// Decks owned by this identity.
    ListDecks,
    /// Store a new deck.
    SaveDeck(DeckPayload),
    /// Select a deck for the next match.
    UseDeck(i64),
    /// Delete a deck.
    DeleteDeck(i64),
    /// Card listing for the builder.
    ListCards,
}

impl DeckRequest {
    /// HTTP method.
    pub fn method(&self) -> Method {
        match self {
            DeckRequest::ListDecks | DeckRequest::ListCards => Method::Get,
            DeckRequest::SaveDeck(_) | DeckRequest::UseDeck(_) => Method::Post,
            DeckRequest::DeleteDeck(_) => Method::Delete,
        }
    }

    /// Request path.
    pub fn path(&self) -> String {
        match self {
            DeckRequest::ListDecks => "/api/decks".to_string(),
            DeckRequest::SaveDeck(_) => "/api/save-deck".to_string(),
            DeckRequest::UseDeck(id) => format!("/api/decks/{}/use", id),
            DeckRequest::DeleteDeck(id) => format!("/api/decks/{}", id),
            DeckRequest::ListCards => "/api/cards".to_string(),
        }
    }

    /// JSON body, if the call has one.
    pub fn body(&self) -> Option<Value> {
        match self {
            DeckRequest::SaveDeck(payload) => serde_json::to_value(payload).ok(),
            _ => None,
        }
    }

    /// `Cookie` header value identifying the caller.
    pub fn cookie(identity: &SessionIdentity) -> String {
        format!("{}={}", IDENTITY_COOKIE, identity)
    }
}

/// A stored deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRecord {
    /// Service-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Card names.
    pub cards: Vec<String>,
    /// Energy type.
    pub energy: EnergyType,
    /// Matchmaking rating.
    #[serde(default = "default_rating")]
    pub rating: i64,
    /// Matches won.
    #[serde(default)]
    pub wins: u32,
    /// Matches played.
    #[serde(default)]
    pub games_played: u32,
    /// Owner identity. The listing endpoint omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Creation time (UTC, no offset on the wire), when the service reports it.
    #[serde(
        default,
        with = "storage_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

fn default_rating() -> i64 {
    DEFAULT_RATING
}

/// Timestamps as the deck store writes them: `YYYY-MM-DD HH:MM:SS`,
/// optionally with a `T` separator, fraction or offset.
mod storage_timestamp {
    use super::*;
    use chrono::DateTime;
    use serde::de::Error;

    const LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
    const ACCEPTED: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    fn parse(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        ACCEPTED
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
            .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|t| t.naive_utc()))
    }

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_some(&time.format(LAYOUT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => parse(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp {:?}", text))),
            None => Ok(None),
        }
    }
}

impl DeckRecord {
    /// Matches lost.
    pub fn losses(&self) -> u32 {
        self.games_played.saturating_sub(self.wins)
    }

    /// Parse a deck listing response body.
    pub fn list_from_json(body: &str) -> Result<Vec<DeckRecord>, serde_json::Error> {
        serde_json::from_str(body)
    }
}
