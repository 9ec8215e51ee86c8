//! Client Configuration
//!
//! Connection and storage settings, with environment overrides.

use std::path::PathBuf;

use chrono::Duration;

use crate::identity::SessionIdentity;

/// Default server base URL.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080";

/// Default path segment between the server URL and the identity.
pub const DEFAULT_WS_PREFIX: &str = "ws";

/// Default identity file location (relative to the working directory).
pub const DEFAULT_IDENTITY_FILE: &str = ".pocket_duel_identity.json";

/// How long a generated identity stays valid, in days.
pub const DEFAULT_IDENTITY_RETENTION_DAYS: i64 = 7;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket base URL, e.g. `ws://localhost:8080`.
    pub server_url: String,
    /// Path prefix for the session endpoint (`/<prefix>/<identity>`).
    pub ws_prefix: String,
    /// Where the session identity record is stored.
    pub identity_path: PathBuf,
    /// Retention window for a newly generated identity.
    pub identity_retention: Duration,
    /// Capacity of the outgoing frame queue.
    pub outgoing_capacity: usize,
    /// Capacity of the connection and session event channels.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_prefix: DEFAULT_WS_PREFIX.to_string(),
            identity_path: PathBuf::from(DEFAULT_IDENTITY_FILE),
            identity_retention: Duration::days(DEFAULT_IDENTITY_RETENTION_DAYS),
            outgoing_capacity: 100,
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: std::env::var("POCKET_DUEL_SERVER_URL").unwrap_or(defaults.server_url),
            ws_prefix: std::env::var("POCKET_DUEL_WS_PREFIX").unwrap_or(defaults.ws_prefix),
            identity_path: std::env::var("POCKET_DUEL_IDENTITY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.identity_path),
            identity_retention: std::env::var("POCKET_DUEL_IDENTITY_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|days| (1..=3650).contains(days))
                .map(Duration::days)
                .unwrap_or(defaults.identity_retention),
            ..defaults
        }
    }

    /// Endpoint for a session: `<server_url>/<ws_prefix>/<identity>`.
    pub fn ws_url(&self, identity: &SessionIdentity) -> String {
        let base = self.server_url.trim_end_matches('/');
        let prefix = self.ws_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", base, identity)
        } else {
            format!("{}/{}/{}", base, prefix, identity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let config = ClientConfig::default();
        let identity = SessionIdentity::parse("client_abc123").unwrap();
        assert_eq!(config.ws_url(&identity), "ws://localhost:8080/ws/client_abc123");
    }

    #[test]
    fn test_url_trims_slashes() {
        let config = ClientConfig {
            server_url: "ws://duel.example:9000/".to_string(),
            ws_prefix: "/socket/".to_string(),
            ..Default::default()
        };
        let identity = SessionIdentity::parse("client_x").unwrap();
        assert_eq!(config.ws_url(&identity), "ws://duel.example:9000/socket/client_x");
    }

    #[test]
    fn test_empty_prefix() {
        let config = ClientConfig {
            ws_prefix: String::new(),
            ..Default::default()
        };
        let identity = SessionIdentity::parse("client_x").unwrap();
        assert_eq!(config.ws_url(&identity), "ws://localhost:8080/client_x");
    }

    #[test]
    fn test_default_retention_is_a_week() {
        assert_eq!(ClientConfig::default().identity_retention, Duration::days(7));
    }
}
