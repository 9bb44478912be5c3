//! HTTP API.
//!
//! # Endpoints
//!
//! - `POST /webhooks/products/{create,update,delete}` – platform webhooks, fanned out to streams
//! - `POST /webhooks/app/{uninstalled,scopes_update}` – app lifecycle webhooks
//! - `GET  /sse/subscribe` (also `/sse.subscribe`)    – live-update stream (admin)
//! - `GET  /sse/connections`                          – open streams of the caller's shop (admin)
//! - `GET  /api/labels`                               – storefront label lookup (public)
//! - `GET  /api/admin/labels`, `PUT|DELETE /api/admin/labels/{product_id}` – label management (admin)

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bblabel_sdk::objects::ErrorResponse;

use crate::state::AppState;

pub mod extractors;
mod labels;
mod stream;
mod webhooks;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(stream::router())
        .merge(labels::router())
}

/// The JSON body used for every unexpected failure.
pub(crate) fn internal_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", message)
}

pub(crate) fn json_error(
    status: StatusCode,
    error: impl Into<String>,
    message: impl Into<String>,
) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        message: message.into(),
    };
    match serde_json::to_string(&body) {
        Ok(json) => (status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(_) => status.into_response(),
    }
}
