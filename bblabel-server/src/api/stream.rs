//! Live-update stream endpoints.

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bblabel_sdk::objects::ConnectionInfoResponse;
use bblabel_sdk::signature::SHOP_DOMAIN_HEADER;
use serde::Deserialize;

use super::extractors::AdminAuth;
use crate::state::AppState;

/// Build the stream router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sse/subscribe", get(subscribe))
        // Path used by the embedded admin UI.
        .route("/sse.subscribe", get(subscribe))
        .route("/sse/connections", get(list_connections))
}

#[derive(Debug, Default, Deserialize)]
struct SubscribeParams {
    #[serde(default)]
    shop: Option<String>,
}

/// Scope of a new stream: `?shop=`, then the shop-domain header, then none.
fn requested_shop(params: SubscribeParams, headers: &HeaderMap) -> Option<String> {
    params.shop.filter(|s| !s.is_empty()).or_else(|| {
        headers
            .get(SHOP_DOMAIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

/// `GET /sse/subscribe`: open an event stream.
///
/// The response body stays open until the client disconnects or the server
/// closes the stream.
async fn subscribe(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Query(params): Query<SubscribeParams>,
    headers: HeaderMap,
) -> Response {
    let shop = requested_shop(params, &headers);
    let subscription = state.hub.subscribe(shop.clone());
    tracing::info!(
        connection_id = %subscription.id(),
        session_shop = %session.shop,
        shop = ?shop,
        "stream subscribed"
    );

    (
        [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Body::from_stream(subscription),
    )
        .into_response()
}

/// `GET /sse/connections`: open streams scoped to the caller's shop.
async fn list_connections(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Json<Vec<ConnectionInfoResponse>> {
    let connections = state
        .hub
        .connections()
        .iter()
        .filter(|c| c.shop.as_deref() == Some(session.shop.as_str()))
        .map(ConnectionInfoResponse::from)
        .collect();
    Json(connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{SHOP, TestApp, bearer, body_json, body_string, session_token};
    use crate::server::build_router;
    use axum::http::{Request, StatusCode};
    use bblabel_sdk::sse::{SseDecoder, SseMessage};
    use futures_util::StreamExt;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn unauthenticated_subscribe_is_rejected() {
        let app = TestApp::new();
        let response = build_router(app.state.clone())
            .oneshot(Request::get("/sse/subscribe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, "Unauthorized");
        assert!(app.state.hub.is_empty());
    }

    #[tokio::test]
    async fn subscribe_streams_ack_then_scoped_events() {
        let app = TestApp::new();
        let response = build_router(app.state.clone())
            .oneshot(
                Request::get(format!("/sse/subscribe?shop={SHOP}"))
                    .header(header::AUTHORIZATION, bearer(SHOP))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream; charset=utf-8"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache, no-transform");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let info = app.state.hub.connections();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].shop.as_deref(), Some(SHOP));

        app.state
            .hub
            .broadcast("product_created", &json!({"id": 1}), Some("b.myshopify.com"));
        app.state
            .hub
            .broadcast("product_created", &json!({"id": 1}), Some(SHOP));

        let mut body = response.into_body().into_data_stream();
        let mut decoder = SseDecoder::new();
        let mut messages = Vec::new();
        while messages.len() < 2 {
            let chunk = body.next().await.unwrap().unwrap();
            messages.extend(decoder.feed(&chunk).unwrap());
        }
        assert_eq!(
            messages[0],
            SseMessage::Event {
                event: None,
                data: format!("connected:{}", info[0].id),
            }
        );
        assert_eq!(
            messages[1],
            SseMessage::Event {
                event: Some("product_created".into()),
                data: "{\"id\":1}".into(),
            }
        );

        drop(body);
        assert!(app.state.hub.is_empty());
    }

    #[tokio::test]
    async fn shop_header_and_id_token_query_are_accepted() {
        let app = TestApp::new();
        let response = build_router(app.state.clone())
            .oneshot(
                Request::get(format!("/sse.subscribe?id_token={}", session_token(SHOP)))
                    .header(SHOP_DOMAIN_HEADER, "c.myshopify.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.state.hub.connections()[0].shop.as_deref(),
            Some("c.myshopify.com")
        );
    }

    #[tokio::test]
    async fn connections_lists_only_the_callers_shop() {
        let app = TestApp::new();
        let _mine = app.state.hub.subscribe(Some(SHOP.into()));
        let _other = app.state.hub.subscribe(Some("b.myshopify.com".into()));
        let _untagged = app.state.hub.subscribe(None);

        let response = build_router(app.state.clone())
            .oneshot(
                Request::get("/sse/connections")
                    .header(header::AUTHORIZATION, bearer(SHOP))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["shop"], SHOP);
    }

    #[test]
    fn query_shop_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SHOP_DOMAIN_HEADER, "h.myshopify.com".parse().unwrap());
        let from_query = requested_shop(
            SubscribeParams {
                shop: Some("q.myshopify.com".into()),
            },
            &headers,
        );
        assert_eq!(from_query.as_deref(), Some("q.myshopify.com"));
        let from_header = requested_shop(SubscribeParams { shop: Some(String::new()) }, &headers);
        assert_eq!(from_header.as_deref(), Some("h.myshopify.com"));
        assert_eq!(requested_shop(SubscribeParams::default(), &HeaderMap::new()), None);
    }
}
