//! Webhook ingestion.
//!
//! One route per topic. Every handler:
//!
//! 1. reads the raw body (bounded by `server.body_limit`),
//! 2. rebuilds the request and hands it to the `AuthGateway`,
//! 3. answers `204` when the authenticated topic belongs to another route,
//! 4. performs the topic's action and answers `200 Webhook processed`.
//!
//! Product topics never wait for delivery: the broadcast is queued for the
//! `EventForwarder` and the platform gets its answer immediately.

use axum::{
    Router,
    body::to_bytes,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bblabel_core::auth::{AuthError, WebhookAuthResult, WebhookRequest};
use bblabel_core::events::HubEvent;
use bblabel_core::store::StoreError;
use bblabel_sdk::objects::stream::event_for_topic;
use bblabel_sdk::objects::{ScopesUpdatePayload, WebhookTopic};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;

use super::internal_error;
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    WebhookTopic::ALL
        .into_iter()
        .fold(Router::new(), |router, topic| {
            router.route(
                &format!("/webhooks/{}", topic.as_str()),
                post(move |state: State<AppState>, request: Request| ingest(topic, state, request)),
            )
        })
}

/// Failures that end in a `500`.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    #[error(transparent)]
    Auth(AuthError),
    #[error("unexpected webhook payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "webhook handling failed");
        internal_error(self.to_string())
    }
}

async fn ingest(
    topic: WebhookTopic,
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, IngressError> {
    let (parts, body) = request.into_parts();
    let body_limit = state.config.server.read().await.body_limit;
    let body = to_bytes(body, body_limit).await.map_err(IngressError::Body)?;
    tracing::debug!(route = %topic, bytes = body.len(), "webhook body received");

    let webhook = WebhookRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    let verified = match state.auth.authenticate_webhook(&webhook).await {
        Ok(verified) => verified,
        Err(e) if e.is_rejection() => {
            tracing::warn!(route = %topic, error = %e, "webhook authentication failed");
            return Ok((StatusCode::UNAUTHORIZED, "Webhook auth failed").into_response());
        }
        Err(e) => return Err(IngressError::Auth(e)),
    };

    if !topic.matches(&verified.topic) {
        tracing::info!(
            route = %topic,
            topic = %verified.topic,
            shop = %verified.shop,
            "ignoring webhook for another topic"
        );
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    tracing::info!(
        topic = %verified.topic,
        shop = %verified.shop,
        webhook_id = verified.webhook_id.as_deref().unwrap_or("-"),
        api_version = verified.api_version.as_deref().unwrap_or("-"),
        "webhook received"
    );

    dispatch(&state, topic, verified).await?;
    Ok((StatusCode::OK, "Webhook processed").into_response())
}

async fn dispatch(
    state: &AppState,
    topic: WebhookTopic,
    verified: WebhookAuthResult,
) -> Result<(), IngressError> {
    if let Some(kind) = event_for_topic(topic) {
        enqueue_broadcast(state, HubEvent::new(kind, verified.payload, Some(verified.shop)));
        return Ok(());
    }

    match topic {
        WebhookTopic::AppUninstalled => {
            // Repeated deliveries after the first one find nothing to delete.
            let summary = state.sessions.purge_shop(&verified.shop).await?;
            tracing::info!(
                shop = %verified.shop,
                sessions = summary.sessions,
                labels = summary.labels,
                "app uninstalled, shop data removed"
            );
        }
        WebhookTopic::AppScopesUpdate => {
            let payload: ScopesUpdatePayload =
                serde_json::from_value(verified.payload).map_err(IngressError::Payload)?;
            let scope = payload.current_scope();
            let updated = state.sessions.update_scope(&verified.shop, &scope).await?;
            tracing::info!(shop = %verified.shop, scope = %scope, updated, "session scope updated");
        }
        WebhookTopic::ProductsCreate | WebhookTopic::ProductsUpdate | WebhookTopic::ProductsDelete => {}
    }
    Ok(())
}

fn enqueue_broadcast(state: &AppState, event: HubEvent) {
    match state.forward_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!(event = %event.kind, shop = ?event.shop, "forward queue full, event dropped");
        }
        Err(TrySendError::Closed(event)) => {
            tracing::error!(event = %event.kind, shop = ?event.shop, "forward queue closed, event dropped");
        }
    }
}
