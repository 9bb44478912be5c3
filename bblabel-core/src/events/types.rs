//! Event types carried between webhook handlers and the forwarder.

use serde_json::Value;

/// A broadcast request for the hub.
///
/// `data` is forwarded verbatim; the hub never inspects it.
#[derive(Debug, Clone, PartialEq)]
pub struct HubEvent {
    /// Stream event name, e.g. `product_created`.
    pub kind: String,
    pub data: Value,
    /// Restricts delivery to streams of this shop (plus untagged streams).
    pub shop: Option<String>,
}

impl HubEvent {
    pub fn new(kind: impl Into<String>, data: Value, shop: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            data,
            shop,
        }
    }
}
