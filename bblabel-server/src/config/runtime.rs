//! Runtime configuration re-exports.
//!
//! The validated config types live in `bblabel-core::config` so that the
//! auth gateway and the hub can read them directly.

pub use bblabel_core::config::{ServerConfig, SharedConfig, ShopifyConfig, StreamConfig};
