pub mod label;
pub mod stream;
pub mod webhook;

pub use label::{LabelResponse, LabelUpsert, LabelValidationError};
pub use stream::ConnectionInfoResponse;
pub use webhook::{ScopesUpdatePayload, WebhookTopic};

use serde::{Deserialize, Serialize};

/// Generic JSON error body returned by the server on internal failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
