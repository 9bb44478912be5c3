//! Label ("badge") objects served to the storefront and the admin UI.

use serde::{Deserialize, Serialize};

/// Longest label text accepted, in characters.
pub const MAX_LABEL_LEN: usize = 40;

pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFD74A";
pub const DEFAULT_TEXT_COLOR: &str = "#1E1E24";

/// A label as returned by `GET /api/labels` and the admin listing.
///
/// The storefront script only reads `enabled` and `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResponse {
    pub product_id: String,
    pub enabled: bool,
    pub label: String,
    pub background_color: String,
    pub text_color: String,
    /// Unix timestamp of the last change.
    pub updated_at: i64,
}

/// Body of `PUT /api/admin/labels/{product_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelUpsert {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub label: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelValidationError {
    #[error("label text must not be empty")]
    EmptyText,
    #[error("label text must be at most {MAX_LABEL_LEN} characters")]
    TextTooLong,
    #[error("{0} is not a #RRGGBB color")]
    InvalidColor(String),
}

impl LabelUpsert {
    /// Check text length and color format.
    pub fn validate(&self) -> Result<(), LabelValidationError> {
        let text = self.label.trim();
        if text.is_empty() {
            return Err(LabelValidationError::EmptyText);
        }
        if text.chars().count() > MAX_LABEL_LEN {
            return Err(LabelValidationError::TextTooLong);
        }
        for color in [&self.background_color, &self.text_color]
            .into_iter()
            .flatten()
        {
            if !is_hex_color(color) {
                return Err(LabelValidationError::InvalidColor(color.clone()));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
