//! Configuration for the OneBot adapter.
//!
//! Read from the `adapters.onebot` section of the runtime configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! [adapters.onebot]
//! # Accept connections from the protocol implementation
//! mode = "reverse"
//! host = "0.0.0.0"
//! port = 8080
//! path = "/onebot/v11/ws"
//! access_token = "secret"
//!
//! # Or dial out to it
//! # mode = "forward"
//! # urls = ["ws://127.0.0.1:6700"]
//! ```

use std::time::Duration;

use sakiko_core::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};

/// Which side opens the WebSocket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// The adapter connects to every url in [`OneBotConfig::urls`].
    Forward,
    /// The adapter listens and the implementation connects to it.
    #[default]
    Reverse,
}

/// OneBot adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    /// Connection direction.
    pub mode: ConnectionMode,
    /// Endpoints dialled in forward mode.
    pub urls: Vec<String>,
    /// Listen address in reverse mode.
    pub host: String,
    /// Listen port in reverse mode.
    pub port: u16,
    /// Accepted request path in reverse mode.
    pub path: String,
    /// Shared bearer token. Empty or absent disables authentication.
    pub access_token: Option<String>,
    /// How long an API call waits for its response.
    pub api_timeout_ms: u64,
    /// Log every received message at info level.
    pub log_event: bool,
    /// Delay before redialling a dropped forward connection; 0 disables.
    pub reconnect_interval_ms: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Reverse,
            urls: Vec::new(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/onebot/v11/ws".to_string(),
            access_token: None,
            api_timeout_ms: 30_000,
            log_event: true,
            reconnect_interval_ms: 3_000,
        }
    }
}

impl OneBotConfig {
    /// Checks the settings that would otherwise fail at connect time.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.mode == ConnectionMode::Forward && self.urls.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "forward mode requires at least one url".into(),
            ));
        }
        if self.mode == ConnectionMode::Reverse && !self.path.starts_with('/') {
            return Err(AdapterError::InvalidConfig(format!(
                "path '{}' must start with '/'",
                self.path
            )));
        }
        if self.api_timeout_ms == 0 {
            return Err(AdapterError::InvalidConfig(
                "api_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Returns the token, treating an empty string as no token.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    /// Returns `None` when reconnection is disabled.
    pub fn reconnect_interval(&self) -> Option<Duration> {
        (self.reconnect_interval_ms > 0).then(|| Duration::from_millis(self.reconnect_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config: OneBotConfig = serde_json::from_value(json!({})).unwrap();

        assert_eq!(config.mode, ConnectionMode::Reverse);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.path, "/onebot/v11/ws");
        assert_eq!(config.api_timeout(), Duration::from_secs(30));
        assert!(config.log_event);
        assert!(config.token().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_forward() {
        let config: OneBotConfig = serde_json::from_value(json!({
            "mode": "forward",
            "urls": ["ws://127.0.0.1:6700", "ws://127.0.0.1:6701"],
            "access_token": "secret",
            "log_event": false,
            "reconnect_interval_ms": 0
        }))
        .unwrap();

        assert_eq!(config.mode, ConnectionMode::Forward);
        assert_eq!(config.urls.len(), 2);
        assert_eq!(config.token(), Some("secret"));
        assert!(!config.log_event);
        assert!(config.reconnect_interval().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_forward_without_urls_is_invalid() {
        let config = OneBotConfig {
            mode: ConnectionMode::Forward,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one url"));
    }

    #[test]
    fn test_empty_token_disables_auth() {
        let config = OneBotConfig {
            access_token: Some(String::new()),
            ..Default::default()
        };
        assert!(config.token().is_none());
    }

    #[test]
    fn test_relative_path_is_invalid() {
        let config = OneBotConfig {
            path: "ws".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
