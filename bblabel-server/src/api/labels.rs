//! Label lookup for the storefront script and label management for the
//! embedded admin.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use bblabel_core::entities::labels::UpsertLabel;
use bblabel_core::store::StoreError;
use bblabel_sdk::objects::{LabelResponse, LabelUpsert, LabelValidationError};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use super::extractors::AdminAuth;
use super::{internal_error, json_error};
use crate::state::AppState;

/// Build the label router.
pub fn router() -> Router<AppState> {
    let storefront = Router::new().route("/api/labels", get(get_label)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET]),
    );

    Router::new()
        .route("/api/admin/labels", get(list_labels))
        .route(
            "/api/admin/labels/{product_id}",
            axum::routing::put(upsert_label).delete(delete_label),
        )
        .merge(storefront)
}

/// Errors that can occur in label handlers.
#[derive(Debug)]
pub(crate) enum LabelApiError {
    Store(StoreError),
    Validation(LabelValidationError),
    NotFound,
}

impl From<StoreError> for LabelApiError {
    fn from(value: StoreError) -> Self {
        LabelApiError::Store(value)
    }
}

impl IntoResponse for LabelApiError {
    fn into_response(self) -> Response {
        match self {
            LabelApiError::Store(e) => {
                tracing::error!(error = %e, "Label API store error");
                internal_error(e.to_string())
            }
            LabelApiError::Validation(e) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid Label", e.to_string())
            }
            LabelApiError::NotFound => {
                json_error(StatusCode::NOT_FOUND, "Not Found", "no label for this product")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelQuery {
    product_id: String,
    #[serde(default)]
    shop: Option<String>,
}

/// `GET /api/labels?productId=&shop=`: public lookup for the storefront.
async fn get_label(
    State(state): State<AppState>,
    Query(query): Query<LabelQuery>,
) -> Result<Json<LabelResponse>, LabelApiError> {
    let shop = query.shop.as_deref().filter(|s| !s.is_empty());
    let record = state
        .labels
        .get_label(shop, &query.product_id)
        .await?
        .ok_or(LabelApiError::NotFound)?;
    Ok(Json(LabelResponse::from(&record)))
}

/// `GET /api/admin/labels`: every label of the session's shop.
async fn list_labels(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Result<Json<Vec<LabelResponse>>, LabelApiError> {
    let records = state.labels.list_labels(&session.shop).await?;
    Ok(Json(records.iter().map(LabelResponse::from).collect()))
}

/// `PUT /api/admin/labels/{product_id}`: create or replace a label.
async fn upsert_label(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Path(product_id): Path<String>,
    Json(body): Json<LabelUpsert>,
) -> Result<Json<LabelResponse>, LabelApiError> {
    body.validate().map_err(LabelApiError::Validation)?;
    let record = state
        .labels
        .upsert_label(UpsertLabel::from_request(&session.shop, &product_id, &body))
        .await?;
    tracing::info!(shop = %session.shop, product_id = %record.product_id, "label saved");
    Ok(Json(LabelResponse::from(&record)))
}

/// `DELETE /api/admin/labels/{product_id}`
async fn delete_label(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Path(product_id): Path<String>,
) -> Result<StatusCode, LabelApiError> {
    if state.labels.delete_label(&session.shop, &product_id).await? {
        tracing::info!(shop = %session.shop, product_id = %product_id, "label deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(LabelApiError::NotFound)
    }
}
