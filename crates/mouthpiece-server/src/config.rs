//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Webhook body cap, matching axum's built-in default.
pub const DEFAULT_MAX_WEBHOOK_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3000`, `0` for auto-assign).
    pub port: u16,
    /// Directory served for plain `GET` requests. `None` disables static files.
    pub static_dir: Option<PathBuf>,
    /// Outbound queue depth per viewer before messages are dropped.
    pub max_send_queue: usize,
    /// Heartbeat ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a viewer after this many seconds without any inbound frame.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted webhook body. Larger requests get 413 with a JSON error.
    pub max_webhook_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            static_dir: Some(PathBuf::from("public")),
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_webhook_body_bytes: DEFAULT_MAX_WEBHOOK_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// `host:port` string passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_3000() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn default_static_dir_is_public() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.static_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn default_heartbeat() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn zero_heartbeat_values_clamped() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 0,
            heartbeat_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"port":8080}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.max_send_queue, 256);
        assert_eq!(cfg.max_webhook_body_bytes, DEFAULT_MAX_WEBHOOK_BODY_BYTES);
    }

    #[test]
    fn static_dir_can_be_disabled() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"static_dir":null}"#).unwrap();
        assert!(cfg.static_dir.is_none());
    }
}
