//! Signature algorithms used by the Shopify platform.
//!
//! Two schemes are involved:
//!
//! * **Webhook signing**: every webhook delivery carries
//!
//!   ```text
//!   X-Shopify-Hmac-Sha256: base64(HMAC-SHA256(raw_body, api_secret))
//!   ```
//!
//!   The HMAC is computed over the exact request bytes, so the body must be
//!   verified before it is parsed.
//!
//! * **Session tokens**: the embedded admin UI authenticates with an
//!   App Bridge session token, an HS256 JWT signed with the same secret:
//!
//!   ```text
//!   Authorization: Bearer {base64url(header)}.{base64url(claims)}.{base64url(signature)}
//!   ```

use serde::{Deserialize, Serialize};

/// Header carrying the webhook HMAC.
pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// Header carrying the webhook topic (e.g. `products/create`).
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";

/// Header carrying the shop domain (e.g. `example.myshopify.com`).
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

/// Unique delivery id; repeated when the platform retries a delivery.
pub const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";

/// Admin API version the payload was rendered with.
pub const API_VERSION_HEADER: &str = "X-Shopify-API-Version";

/// Clock skew tolerated when checking `exp` / `nbf` of session tokens.
pub const SESSION_TOKEN_LEEWAY: i64 = 5;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token audience mismatch")]
    AudienceMismatch,
    #[error("token destination is not a shop url")]
    InvalidDestination,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn hmac_key(secret: &[u8]) -> ring::hmac::Key {
    ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret)
}

// ---------------------------------------------------------------------------
// Webhook signing
// ---------------------------------------------------------------------------

/// Compute the `X-Shopify-Hmac-Sha256` header value for a raw body.
pub fn sign_body(body: &[u8], secret: &[u8]) -> String {
    let tag = ring::hmac::sign(&hmac_key(secret), body);
    fast32::base64::RFC4648.encode(tag.as_ref())
}

/// Verify a raw webhook body against its `X-Shopify-Hmac-Sha256` header.
///
/// The comparison is constant time.
pub fn verify_body(body: &[u8], header_value: &str, secret: &[u8]) -> Result<(), SignatureError> {
    let signature = fast32::base64::RFC4648
        .decode_str(header_value.trim())
        .map_err(|_| SignatureError::InvalidBase64)?;
    ring::hmac::verify(&hmac_key(secret), body, &signature)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Session tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Claims of an App Bridge session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    /// Shop admin url, e.g. `https://example.myshopify.com/admin`.
    pub iss: String,
    /// Shop url, e.g. `https://example.myshopify.com`.
    pub dest: String,
    /// The app's API key.
    pub aud: String,
    /// Staff member id.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

impl SessionTokenClaims {
    /// The shop domain (`example.myshopify.com`) the token was issued for.
    pub fn shop_domain(&self) -> Result<String, SignatureError> {
        let dest = url::Url::parse(&self.dest).map_err(|_| SignatureError::InvalidDestination)?;
        dest.host_str()
            .map(str::to_owned)
            .ok_or(SignatureError::InvalidDestination)
    }
}

fn b64url_encode(bytes: &[u8]) -> String {
    fast32::base64::RFC4648_URL_NOPAD.encode(bytes)
}

fn b64url_decode(text: &str) -> Result<Vec<u8>, SignatureError> {
    fast32::base64::RFC4648_URL_NOPAD
        .decode_str(text)
        .map_err(|_| SignatureError::InvalidBase64)
}

/// Sign a session token. Used by clients and tests; the platform issues
/// real tokens.
pub fn sign_session_token(
    claims: &SessionTokenClaims,
    secret: &[u8],
) -> Result<String, SignatureError> {
    let header = TokenHeader {
        alg: "HS256".to_owned(),
        typ: Some("JWT".to_owned()),
    };
    let signing_input = format!(
        "{}.{}",
        b64url_encode(&serde_json::to_vec(&header)?),
        b64url_encode(&serde_json::to_vec(claims)?)
    );
    let tag = ring::hmac::sign(&hmac_key(secret), signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", b64url_encode(tag.as_ref())))
}

/// Verify a session token and return its claims.
///
/// Checks the HS256 signature, the audience, and `exp` / `nbf` with
/// [`SESSION_TOKEN_LEEWAY`] seconds of tolerance.
pub fn verify_session_token(
    token: &str,
    secret: &[u8],
    audience: &str,
) -> Result<SessionTokenClaims, SignatureError> {
    let mut parts = token.trim().split('.');
    let (Some(header), Some(claims), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SignatureError::InvalidFormat);
    };

    let parsed_header: TokenHeader = serde_json::from_slice(&b64url_decode(header)?)?;
    if parsed_header.alg != "HS256" {
        return Err(SignatureError::UnsupportedAlgorithm(parsed_header.alg));
    }

    let signing_input_len = header.len() + 1 + claims.len();
    let signing_input = &token.trim()[..signing_input_len];
    ring::hmac::verify(
        &hmac_key(secret),
        signing_input.as_bytes(),
        &b64url_decode(signature)?,
    )?;

    let claims: SessionTokenClaims = serde_json::from_slice(&b64url_decode(claims)?)?;
    if claims.aud != audience {
        return Err(SignatureError::AudienceMismatch);
    }

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now > claims.exp + SESSION_TOKEN_LEEWAY {
        return Err(SignatureError::Expired);
    }
    if now + SESSION_TOKEN_LEEWAY < claims.nbf {
        return Err(SignatureError::NotYetValid);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"hush";

    fn claims(exp_offset: i64) -> SessionTokenClaims {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        SessionTokenClaims {
            iss: "https://a.myshopify.com/admin".into(),
            dest: "https://a.myshopify.com".into(),
            aud: "api-key".into(),
            sub: Some("42".into()),
            exp: now + exp_offset,
            nbf: now - 10,
            iat: now - 10,
            jti: None,
            sid: None,
        }
    }

    #[test]
    fn body_signature_roundtrip() {
        let body = br#"{"id":1,"title":"Shirt"}"#;
        let header = sign_body(body, SECRET);
        assert!(verify_body(body, &header, SECRET).is_ok());
    }

    #[test]
    fn body_signature_rejects_altered_bytes() {
        let header = sign_body(br#"{"id":1}"#, SECRET);
        let err = verify_body(br#"{"id": 1}"#, &header, SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch));
    }

    #[test]
    fn body_signature_rejects_garbage_header() {
        let err = verify_body(b"{}", "***", SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidBase64));
    }

    #[test]
    fn session_token_roundtrip() {
        let token = sign_session_token(&claims(60), SECRET).unwrap();
        let verified = verify_session_token(&token, SECRET, "api-key").unwrap();
        assert_eq!(verified.shop_domain().unwrap(), "a.myshopify.com");
    }

    #[test]
    fn session_token_wrong_secret() {
        let token = sign_session_token(&claims(60), SECRET).unwrap();
        let err = verify_session_token(&token, b"other", "api-key").unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch));
    }

    #[test]
    fn session_token_wrong_audience() {
        let token = sign_session_token(&claims(60), SECRET).unwrap();
        let err = verify_session_token(&token, SECRET, "someone-else").unwrap_err();
        assert!(matches!(err, SignatureError::AudienceMismatch));
    }

    #[test]
    fn session_token_expired() {
        let token = sign_session_token(&claims(-60), SECRET).unwrap();
        let err = verify_session_token(&token, SECRET, "api-key").unwrap_err();
        assert!(matches!(err, SignatureError::Expired));
    }

    #[test]
    fn session_token_malformed() {
        let err = verify_session_token("a.b", SECRET, "api-key").unwrap_err();
        assert!(matches!(err, SignatureError::InvalidFormat));
    }
}
