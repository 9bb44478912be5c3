use super::{AdminSession, AuthError, AuthGateway, WebhookAuthResult, WebhookRequest};
use crate::config::ShopifyConfig;
use async_trait::async_trait;
use bblabel_sdk::signature::{
    API_VERSION_HEADER, HMAC_HEADER, SHOP_DOMAIN_HEADER, SignatureError, TOPIC_HEADER,
    WEBHOOK_ID_HEADER, verify_body, verify_session_token,
};
use http::{HeaderMap, Uri, header::AUTHORIZATION};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// Query parameter App Bridge uses for the session token on document loads.
const ID_TOKEN_PARAM: &str = "id_token";

/// Authenticates requests with the app's Shopify credentials.
///
/// Reads the credentials on every call, so a config reload takes effect
/// immediately.
#[derive(Clone)]
pub struct ShopifyAuthGateway {
    config: Arc<RwLock<ShopifyConfig>>,
}

impl ShopifyAuthGateway {
    pub fn new(config: Arc<RwLock<ShopifyConfig>>) -> Self {
        Self { config }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(name))
}

fn optional_header(headers: &HeaderMap, name: &'static str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn session_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }
    url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .find(|(key, _)| key == ID_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl AuthGateway for ShopifyAuthGateway {
    #[tracing::instrument(skip_all, err(level = "debug"), name = "Auth:Webhook")]
    async fn authenticate_webhook(
        &self,
        request: &WebhookRequest,
    ) -> Result<WebhookAuthResult, AuthError> {
        let headers = &request.headers;
        let hmac = header_str(headers, HMAC_HEADER)?;
        {
            let config = self.config.read().await;
            verify_body(&request.body, hmac, config.secret_bytes())?;
        }

        let topic = header_str(headers, TOPIC_HEADER)?.to_owned();
        let shop = header_str(headers, SHOP_DOMAIN_HEADER)?.to_owned();
        let payload = serde_json::from_slice(&request.body).map_err(AuthError::MalformedPayload)?;

        Ok(WebhookAuthResult {
            shop,
            topic,
            webhook_id: optional_header(headers, WEBHOOK_ID_HEADER),
            api_version: optional_header(headers, API_VERSION_HEADER),
            payload,
        })
    }

    #[tracing::instrument(skip_all, err(level = "debug"), name = "Auth:Admin")]
    async fn authenticate_admin(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<AdminSession, AuthError> {
        let token = session_token(headers, uri).ok_or(AuthError::MissingCredentials)?;
        let claims = {
            let config = self.config.read().await;
            verify_session_token(&token, config.secret_bytes(), &config.api_key)?
        };
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
            .map_err(|_| SignatureError::InvalidFormat)?;

        Ok(AdminSession {
            shop: claims.shop_domain()?,
            user_id: claims.sub,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bblabel_sdk::signature::{SessionTokenClaims, sign_body, sign_session_token};
    use bytes::Bytes;
    use http::{HeaderValue, Method};
    use serde_json::json;

    const KEY: &str = "test-api-key";
    const SECRET: &[u8] = b"test-api-secret";

    fn gateway() -> ShopifyAuthGateway {
        ShopifyAuthGateway::new(Arc::new(RwLock::new(ShopifyConfig::new(KEY, SECRET))))
    }

    fn webhook(body: &str, signature: &str) -> WebhookRequest {
        let mut headers = HeaderMap::new();
        headers.insert(HMAC_HEADER, HeaderValue::from_str(signature).unwrap());
        headers.insert(TOPIC_HEADER, HeaderValue::from_static("products/create"));
        headers.insert(SHOP_DOMAIN_HEADER, HeaderValue::from_static("a.myshopify.com"));
        headers.insert(WEBHOOK_ID_HEADER, HeaderValue::from_static("wh-1"));
        WebhookRequest {
            method: Method::POST,
            uri: Uri::from_static("/webhooks/products/create"),
            headers,
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn claims(exp_offset: i64) -> SessionTokenClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        SessionTokenClaims {
            iss: "https://a.myshopify.com/admin".into(),
            dest: "https://a.myshopify.com".into(),
            aud: KEY.into(),
            sub: Some("42".into()),
            exp: now + exp_offset,
            nbf: now - 10,
            iat: now - 10,
            jti: None,
            sid: None,
        }
    }

    #[tokio::test]
    async fn accepts_signed_webhook() {
        let body = r#"{"id":1}"#;
        let result = gateway()
            .authenticate_webhook(&webhook(body, &sign_body(body.as_bytes(), SECRET)))
            .await
            .unwrap();
        assert_eq!(result.shop, "a.myshopify.com");
        assert_eq!(result.topic, "products/create");
        assert_eq!(result.webhook_id.as_deref(), Some("wh-1"));
        assert_eq!(result.api_version, None);
        assert_eq!(result.payload, json!({"id": 1}));
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let body = r#"{"id":1}"#;
        let err = gateway()
            .authenticate_webhook(&webhook(body, &sign_body(body.as_bytes(), b"other")))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn rejects_missing_signature() {
        let mut request = webhook("{}", "x");
        request.headers.remove(HMAC_HEADER);
        let err = gateway().authenticate_webhook(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingHeader(HMAC_HEADER)));
    }

    #[tokio::test]
    async fn signed_non_json_body_is_not_a_rejection() {
        let body = "not json";
        let err = gateway()
            .authenticate_webhook(&webhook(body, &sign_body(body.as_bytes(), SECRET)))
            .await
            .unwrap_err();
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn accepts_bearer_session_token() {
        let token = sign_session_token(&claims(60), SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let session = gateway()
            .authenticate_admin(&headers, &Uri::from_static("/sse/subscribe"))
            .await
            .unwrap();
        assert_eq!(session.shop, "a.myshopify.com");
        assert_eq!(session.user_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn accepts_id_token_query() {
        let token = sign_session_token(&claims(60), SECRET).unwrap();
        let uri: Uri = format!("/sse/subscribe?shop=a.myshopify.com&id_token={token}")
            .parse()
            .unwrap();
        let session = gateway()
            .authenticate_admin(&HeaderMap::new(), &uri)
            .await
            .unwrap();
        assert_eq!(session.shop, "a.myshopify.com");
    }

    #[tokio::test]
    async fn rejects_expired_or_foreign_tokens() {
        let uri = Uri::from_static("/");
        let gateway = gateway();

        for token in [
            sign_session_token(&claims(-60), SECRET).unwrap(),
            sign_session_token(&claims(60), b"other-secret").unwrap(),
            sign_session_token(
                &SessionTokenClaims {
                    aud: "other-app".into(),
                    ..claims(60)
                },
                SECRET,
            )
            .unwrap(),
        ] {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            );
            let err = gateway.authenticate_admin(&headers, &uri).await.unwrap_err();
            assert!(err.is_rejection());
        }

        let err = gateway
            .authenticate_admin(&HeaderMap::new(), &uri)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn reload_changes_secret() {
        let config = Arc::new(RwLock::new(ShopifyConfig::new(KEY, SECRET)));
        let gateway = ShopifyAuthGateway::new(config.clone());
        *config.write().await = ShopifyConfig::new(KEY, b"rotated".as_slice());

        let body = "{}";
        let request = webhook(body, &sign_body(body.as_bytes(), b"rotated"));
        assert!(gateway.authenticate_webhook(&request).await.is_ok());
    }
}
