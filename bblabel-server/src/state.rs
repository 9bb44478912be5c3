//! Application state shared across all request handlers.

use bblabel_core::auth::AuthGateway;
use bblabel_core::config::SharedConfig;
use bblabel_core::events::HubEventSender;
use bblabel_core::hub::EventHub;
use bblabel_core::store::{LabelStore, SessionStore};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Registry of live event streams.
    pub hub: EventHub,
    pub auth: Arc<dyn AuthGateway>,
    pub labels: Arc<dyn LabelStore>,
    pub sessions: Arc<dyn SessionStore>,
    /// Queue drained by the `EventForwarder`.
    pub forward_tx: HubEventSender,
    /// Runtime configuration (partly reloadable via SIGHUP).
    pub config: SharedConfig,
}
