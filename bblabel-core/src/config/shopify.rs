/// Credentials of the Shopify app.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Client id; also the expected `aud` of session tokens.
    pub api_key: String,
    /// Client secret used for webhook HMACs and session-token signatures.
    pub api_secret: Box<[u8]>,
}

impl ShopifyConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.api_secret
    }
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
