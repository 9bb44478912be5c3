//! Runtime configuration shared by the server and the core services.
//!
//! These are the validated forms; parsing the TOML file and applying
//! environment overrides happens in the server crate.

mod server;
mod shopify;
mod stream;

pub use server::{DEFAULT_BODY_LIMIT, ServerConfig};
pub use shopify::ShopifyConfig;
pub use stream::StreamConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with a separate lock per reloadable section.
///
/// `stream` is fixed at startup: the hub and the forward queue are sized
/// from it once.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub shopify: Arc<RwLock<ShopifyConfig>>,
    pub stream: StreamConfig,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, shopify: ShopifyConfig, stream: StreamConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            shopify: Arc::new(RwLock::new(shopify)),
            stream,
        }
    }
}
