//! Configuration module for bblabel-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{ServerConfig, SharedConfig, ShopifyConfig, StreamConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `shopify.api_key`.
pub const API_KEY_ENV: &str = "SHOPIFY_API_KEY";
/// Environment variable overriding `shopify.api_secret`.
pub const API_SECRET_ENV: &str = "SHOPIFY_API_SECRET";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub shopify: ShopifyConfig,
    pub stream: StreamConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(self.server, self.shopify, self.stream)
    }
}

/// Values taken from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_key: read(API_KEY_ENV),
            api_secret: read(API_SECRET_ENV),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file means all defaults)
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.config_path.display(),
                    "config file not found, using defaults"
                );
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        self.build(&content, EnvOverrides::from_env())
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn build(&self, content: &str, env: EnvOverrides) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(api_key) = env.api_key {
            file_config.shopify.api_key = api_key;
        }
        if let Some(api_secret) = env.api_secret {
            file_config.shopify.api_secret = api_secret;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.shopify.api_key.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "shopify.api_key is empty (set it in the file or via {API_KEY_ENV})"
        )));
    }
    if config.shopify.api_secret.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "shopify.api_secret is empty (set it in the file or via {API_SECRET_ENV})"
        )));
    }
    if config.stream.heartbeat_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "stream.heartbeat_interval_secs must be positive".into(),
        ));
    }
    if config.stream.channel_capacity == 0 || config.stream.forward_queue == 0 {
        return Err(ConfigError::ValidationError(
            "stream buffers must hold at least one frame".into(),
        ));
    }
    if config.server.body_limit == 0 {
        return Err(ConfigError::ValidationError(
            "server.body_limit must be positive".into(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
            body_limit: file_config.server.body_limit,
        },
        shopify: ShopifyConfig::new(
            file_config.shopify.api_key,
            file_config.shopify.api_secret.into_bytes().into_boxed_slice(),
        ),
        stream: StreamConfig {
            heartbeat_interval: Duration::from_secs(file_config.stream.heartbeat_interval_secs),
            channel_capacity: file_config.stream.channel_capacity,
            forward_queue: file_config.stream.forward_queue,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[shopify]
api_key = "file-key"
api_secret = "file-secret"
"#;

    #[test]
    fn env_overrides_file_credentials() {
        let loader = ConfigLoader::new("unused.toml", None);
        let loaded = loader
            .build(
                BASE,
                EnvOverrides {
                    api_key: None,
                    api_secret: Some("env-secret".into()),
                },
            )
            .unwrap();
        assert_eq!(loaded.shopify.api_key, "file-key");
        assert_eq!(loaded.shopify.secret_bytes(), b"env-secret");
    }

    #[test]
    fn listen_override_wins() {
        let listen: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loader = ConfigLoader::new("unused.toml", Some(listen));
        let loaded = loader.build(BASE, EnvOverrides::default()).unwrap();
        assert_eq!(loaded.server.listen, listen);
        assert_eq!(loaded.stream.heartbeat_interval, Duration::from_secs(20));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let loader = ConfigLoader::new("unused.toml", None);
        let err = loader.build("", EnvOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let loader = ConfigLoader::new("unused.toml", None);
        let content = format!("{BASE}\n[stream]\nheartbeat_interval_secs = 0\n");
        let err = loader.build(&content, EnvOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::new("/nonexistent/bblabel-config.toml", None);
        // Without credentials in the environment validation fails, which
        // proves the file read itself succeeded.
        match loader.load() {
            Ok(loaded) => assert_eq!(loaded.server.listen.port(), 3000),
            Err(e) => assert!(matches!(e, ConfigError::ValidationError(_))),
        }
    }
}
