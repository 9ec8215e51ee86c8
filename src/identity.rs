//! Session Identity
//!
//! A stable, URL-safe token that addresses this client's connection. It is
//! generated once, stored in a single-record file and reused until its
//! retention window runs out.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;

/// Prefix for generated identities.
pub const IDENTITY_PREFIX: &str = "client_";

/// Opaque client identifier used as the connection address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self(format!("{}{}", IDENTITY_PREFIX, Uuid::new_v4().simple()))
    }

    /// Accept an existing token if it is non-empty and URL-safe.
    pub fn parse(token: &str) -> Result<Self, IdentityError> {
        let url_safe = token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if token.is_empty() || !url_safe {
            return Err(IdentityError::Invalid(token.to_string()));
        }
        Ok(Self(token.to_string()))
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionIdentity> for String {
    fn from(identity: SessionIdentity) -> Self {
        identity.0
    }
}

/// Identity errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Token contains characters that cannot appear in a URL path segment.
    #[error("invalid session identity {0:?}")]
    Invalid(String),
    /// Identity file could not be read or written.
    #[error("identity file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Record could not be encoded.
    #[error("failed to encode identity record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk record. One identity, one expiry.
#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    client_id: SessionIdentity,
    expires_at: DateTime<Utc>,
}

/// File-backed identity storage.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
    retention: Duration,
}

impl IdentityStore {
    /// Create a store at `path` with the given retention window.
    pub fn new(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            path: path.into(),
            retention,
        }
    }

    /// Create a store from client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.identity_path.clone(), config.identity_retention)
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored identity if one exists and has not expired.
    ///
    /// A record that cannot be parsed is treated as absent.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<SessionIdentity>, IdentityError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IdentityError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let record: IdentityRecord = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable identity record {}: {}", self.path.display(), e);
                return Ok(None);
            }
        };

        if now >= record.expires_at {
            debug!("Stored identity expired at {}", record.expires_at);
            return Ok(None);
        }

        Ok(Some(record.client_id))
    }

    /// Return the stored identity, or generate and persist a new one.
    ///
    /// The expiry is fixed when the identity is created.
    pub fn load_or_create(&self, now: DateTime<Utc>) -> Result<SessionIdentity, IdentityError> {
        if let Some(identity) = self.load(now)? {
            debug!("Reusing session identity {}", identity);
            return Ok(identity);
        }

        let identity = SessionIdentity::generate();
        let record = IdentityRecord {
            client_id: identity.clone(),
            expires_at: now + self.retention,
        };
        self.write(&record)?;
        info!("Generated new session identity {}", identity);
        Ok(identity)
    }

    /// Delete the stored identity.
    pub fn forget(&self) -> Result<(), IdentityError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IdentityError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, record: &IdentityRecord) -> Result<(), IdentityError> {
        let io_err = |source| IdentityError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, text).map_err(io_err)
    }
}
