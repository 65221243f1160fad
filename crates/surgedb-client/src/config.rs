//! Client configuration.
//!
//! Compiled defaults with `SURGEDB_*` environment overrides. Invalid env
//! values are silently ignored (fall back to the default), matching the
//! strict-parse-or-skip policy used elsewhere in the stack. Endpoint
//! validation itself happens when the transport is constructed, so a bad
//! URL is reported exactly once.

use serde::{Deserialize, Serialize};

/// Default endpoint: a local server on its conventional port.
pub const DEFAULT_DATABASE_URL: &str = "ws://127.0.0.1:8080/ws";

/// Configuration for a [`Database`](crate::Database) connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// WebSocket endpoint of the database server (`ws://` or `wss://`).
    pub database_url: String,
}

impl ClientConfig {
    /// Configuration pointing at the given endpoint.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `SURGEDB_*` environment overrides to this configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = read_env_nonempty("SURGEDB_DATABASE_URL") {
            self.database_url = url;
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_URL)
    }
}

/// Read a non-empty env var, trimming whitespace. Empty or unset yields
/// `None`.
fn read_env_nonempty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn new_takes_any_url() {
        let config = ClientConfig::new("wss://db.example.com/ws");
        assert_eq!(config.database_url, "wss://db.example.com/ws");
    }

    #[test]
    fn serde_uses_camel_case() {
        let config = ClientConfig::new("ws://x/ws");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("databaseUrl"));
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn read_env_nonempty_unset_is_none() {
        assert!(read_env_nonempty("SURGEDB_TEST_UNSET_VAR").is_none());
    }

    #[test]
    fn from_env_without_overrides_is_default() {
        // No SURGEDB_* vars are set in the test environment.
        assert_eq!(ClientConfig::from_env(), ClientConfig::default());
    }
}
