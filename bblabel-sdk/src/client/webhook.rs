//! Webhook delivery client.
//!
//! Signs payloads the same way the platform does so a local server can be
//! exercised without a real store.

use reqwest::{Client, StatusCode};
use url::Url;

use super::ClientError;
use crate::objects::WebhookTopic;
use crate::signature::{HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER, WEBHOOK_ID_HEADER, sign_body};

/// Delivers signed webhooks to a running server.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    base_url: Url,
    secret: Vec<u8>,
}

impl WebhookClient {
    /// * `base_url` – root URL of the server.
    /// * `api_secret` – the app's API secret used for the HMAC.
    pub fn new(base_url: Url, api_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: api_secret.into(),
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /webhooks/{topic}` – deliver `payload` for `shop`.
    ///
    /// Returns the status the server answered with; webhook endpoints reply
    /// with plain text, so non-2xx codes are not turned into errors.
    pub async fn deliver(
        &self,
        topic: WebhookTopic,
        shop: &str,
        webhook_id: &str,
        payload: &serde_json::Value,
    ) -> Result<StatusCode, ClientError> {
        let body = serde_json::to_vec(payload)?;
        let url = self
            .base_url
            .join(&format!("/webhooks/{}", topic.as_str()))?;

        let resp = self
            .http
            .post(url)
            .header(HMAC_HEADER, sign_body(&body, &self.secret))
            .header(TOPIC_HEADER, topic.as_str())
            .header(SHOP_DOMAIN_HEADER, shop)
            .header(WEBHOOK_ID_HEADER, webhook_id)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(resp.status())
    }
}
