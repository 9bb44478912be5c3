//! Admin API client (embedded admin UI → server).
//!
//! Every request carries an App Bridge session token as a bearer token.

use reqwest::{Client, StatusCode};
use url::Url;

use super::{ClientError, ensure_success, parse_response};
use crate::objects::{ConnectionInfoResponse, LabelResponse, LabelUpsert};

/// Typed HTTP client for the label admin endpoints.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    session_token: String,
}

impl AdminClient {
    pub fn new(base_url: Url, session_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session_token: session_token.into(),
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Swap the session token; App Bridge tokens live for one minute.
    pub fn set_session_token(&mut self, token: impl Into<String>) {
        self.session_token = token.into();
    }

    /// `GET /api/admin/labels`
    pub async fn list_labels(&self) -> Result<Vec<LabelResponse>, ClientError> {
        let url = self.base_url.join("/api/admin/labels")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.session_token)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `PUT /api/admin/labels/{product_id}`
    pub async fn upsert_label(
        &self,
        product_id: &str,
        label: &LabelUpsert,
    ) -> Result<LabelResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/admin/labels/{product_id}"))?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.session_token)
            .json(label)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `DELETE /api/admin/labels/{product_id}`
    ///
    /// Returns `false` when there was no label to delete.
    pub async fn delete_label(&self, product_id: &str) -> Result<bool, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/admin/labels/{product_id}"))?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.session_token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(resp).await?;
        Ok(true)
    }

    /// `GET /sse/connections`
    pub async fn list_connections(&self) -> Result<Vec<ConnectionInfoResponse>, ClientError> {
        let url = self.base_url.join("/sse/connections")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.session_token)
            .send()
            .await?;
        parse_response(resp).await
    }
}
