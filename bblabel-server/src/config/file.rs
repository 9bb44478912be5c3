//! TOML file configuration structures.
//!
//! These structs directly map to the `bblabel-config.toml` file format.
//! Every section is optional; missing values fall back to defaults.

use bblabel_core::config::DEFAULT_BODY_LIMIT;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub shopify: ShopifyConfig,
    pub stream: StreamConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    pub listen: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Shopify app credentials. Usually supplied through the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopifyConfig {
    pub api_key: String,
    pub api_secret: String,
}

/// Live-update stream section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub heartbeat_interval_secs: u64,
    pub channel_capacity: usize,
    pub forward_queue: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 20,
            channel_capacity: 64,
            forward_queue: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"
body_limit = 2048

[shopify]
api_key = "key"
api_secret = "secret"

[stream]
heartbeat_interval_secs = 15
channel_capacity = 8
forward_queue = 32
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.body_limit, 2048);
        assert_eq!(config.shopify.api_key, "key");
        assert_eq!(config.stream.heartbeat_interval_secs, 15);
        assert_eq!(config.stream.forward_queue, 32);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(config.stream.heartbeat_interval_secs, 20);
        assert!(config.shopify.api_secret.is_empty());
    }
}
