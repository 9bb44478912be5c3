//! Request authentication.
//!
//! [`AuthGateway`] answers two questions for the HTTP layer: is this webhook
//! really from the platform, and does this admin request carry a valid
//! session. [`ShopifyAuthGateway`] is the production implementation; tests
//! and alternative platforms can provide their own.

mod shopify;

pub use shopify::ShopifyAuthGateway;

use async_trait::async_trait;
use bblabel_sdk::signature::SignatureError;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// A webhook request rebuilt from its raw parts.
///
/// The body is kept byte-exact; signature checks run over it.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The verified contents of a webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookAuthResult {
    /// Shop domain the webhook was sent for.
    pub shop: String,
    /// Topic as the platform sent it, e.g. `products/create`.
    pub topic: String,
    pub webhook_id: Option<String>,
    pub api_version: Option<String>,
    pub payload: Value,
}

/// An authenticated merchant admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub shop: String,
    /// Staff member id, when the token carries one.
    pub user_id: Option<String>,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("header {0} is not valid")]
    InvalidHeader(&'static str),
    #[error("no session token in request")]
    MissingCredentials,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// The request was authentic but its body is not JSON.
    #[error("webhook payload is not valid json: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

impl AuthError {
    /// Whether the request should be rejected as unauthenticated.
    ///
    /// Everything except a malformed (but correctly signed) payload is.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AuthError::MalformedPayload(_))
    }
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Verify a webhook and decode its payload.
    async fn authenticate_webhook(
        &self,
        request: &WebhookRequest,
    ) -> Result<WebhookAuthResult, AuthError>;

    /// Verify the session of an embedded-admin request.
    async fn authenticate_admin(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<AdminSession, AuthError>;
}
