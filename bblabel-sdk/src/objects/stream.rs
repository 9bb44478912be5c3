//! Event names and inspection objects for the live-update stream.
//!
//! # Protocol
//!
//! 1. `GET /sse/subscribe` answers with `text/event-stream`.
//! 2. The first frame is an unnamed `data: connected:{connection_id}`.
//! 3. `: ping` comments arrive every heartbeat interval and carry no data.
//! 4. Named frames (`product_created`, `product_updated`,
//!    `product_deleted`) carry the platform's webhook payload verbatim as
//!    JSON.
//! 5. A `: closing` comment precedes a server-side close.

use serde::{Deserialize, Serialize};

use super::webhook::WebhookTopic;

pub const PRODUCT_CREATED: &str = "product_created";
pub const PRODUCT_UPDATED: &str = "product_updated";
pub const PRODUCT_DELETED: &str = "product_deleted";

/// The stream event emitted for a webhook topic, if any.
pub fn event_for_topic(topic: WebhookTopic) -> Option<&'static str> {
    match topic {
        WebhookTopic::ProductsCreate => Some(PRODUCT_CREATED),
        WebhookTopic::ProductsUpdate => Some(PRODUCT_UPDATED),
        WebhookTopic::ProductsDelete => Some(PRODUCT_DELETED),
        WebhookTopic::AppUninstalled | WebhookTopic::AppScopesUpdate => None,
    }
}

/// A live stream as reported by `GET /sse/connections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfoResponse {
    pub id: String,
    pub shop: Option<String>,
    /// Unix timestamp of when the stream was opened.
    pub connected_at: i64,
}
