//! Webhook topics the app subscribes to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A platform webhook topic.
///
/// Topics are matched case-insensitively; the platform sends them in
/// lowercase (`products/create`) but older API versions used mixed case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookTopic {
    #[serde(rename = "products/create")]
    ProductsCreate,
    #[serde(rename = "products/update")]
    ProductsUpdate,
    #[serde(rename = "products/delete")]
    ProductsDelete,
    #[serde(rename = "app/uninstalled")]
    AppUninstalled,
    #[serde(rename = "app/scopes_update")]
    AppScopesUpdate,
}

impl WebhookTopic {
    pub const ALL: [WebhookTopic; 5] = [
        WebhookTopic::ProductsCreate,
        WebhookTopic::ProductsUpdate,
        WebhookTopic::ProductsDelete,
        WebhookTopic::AppUninstalled,
        WebhookTopic::AppScopesUpdate,
    ];

    /// Topic string as sent in the `X-Shopify-Topic` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookTopic::ProductsCreate => "products/create",
            WebhookTopic::ProductsUpdate => "products/update",
            WebhookTopic::ProductsDelete => "products/delete",
            WebhookTopic::AppUninstalled => "app/uninstalled",
            WebhookTopic::AppScopesUpdate => "app/scopes_update",
        }
    }

    /// Whether a raw topic string names this topic.
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown webhook topic {0:?}")]
pub struct UnknownTopic(pub String);

impl FromStr for WebhookTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WebhookTopic::ALL
            .into_iter()
            .find(|topic| topic.matches(s))
            .ok_or_else(|| UnknownTopic(s.to_owned()))
    }
}

/// Payload of the `app/scopes_update` webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopesUpdatePayload {
    /// Scopes granted after the update.
    pub current: Vec<String>,
    /// Scopes granted before the update.
    #[serde(default)]
    pub previous: Vec<String>,
}

impl ScopesUpdatePayload {
    /// Comma-separated scope string, as stored on sessions.
    pub fn current_scope(&self) -> String {
        self.current.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_matching_ignores_case() {
        assert!(WebhookTopic::ProductsDelete.matches("PRODUCTS/DELETE"));
        assert!(!WebhookTopic::ProductsDelete.matches("products/update"));
        assert_eq!(
            "App/Uninstalled".parse::<WebhookTopic>().unwrap(),
            WebhookTopic::AppUninstalled
        );
        assert!("orders/create".parse::<WebhookTopic>().is_err());
    }

    #[test]
    fn scopes_payload() {
        let payload: ScopesUpdatePayload =
            serde_json::from_str(r#"{"current":["read_products","write_products"]}"#).unwrap();
        assert_eq!(payload.current_scope(), "read_products,write_products");
        assert!(payload.previous.is_empty());
    }
}
