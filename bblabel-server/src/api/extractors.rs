//! Custom Axum extractors for request authentication.
//!
//! Provides `AdminAuth`, which requires a valid embedded-admin session and
//! yields it to the handler. Verification is delegated to the
//! [`AuthGateway`](bblabel_core::auth::AuthGateway) in the app state.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use bblabel_core::auth::{AdminSession, AuthError};

use crate::state::AppState;

/// An authenticated admin session.
pub struct AdminAuth(pub AdminSession);

/// Rejection of [`AdminAuth`]. Always a plain `401 Unauthorized`; the cause is
/// only logged.
#[derive(Debug)]
pub struct AdminAuthRejection(AuthError);

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self.0, "admin authentication failed");
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate_admin(&parts.headers, &parts.uri)
            .await
            .map(AdminAuth)
            .map_err(AdminAuthRejection)
    }
}
