//! Channel factories for hub events.

use super::types::HubEvent;
use tokio::sync::mpsc;

/// Default buffer size for the forward queue.
///
/// Enough to absorb a burst of product webhooks while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for HubEvent events.
pub type HubEventSender = mpsc::Sender<HubEvent>;
/// Receiver handle for HubEvent events.
pub type HubEventReceiver = mpsc::Receiver<HubEvent>;

/// Create the forward queue with the default buffer.
pub fn hub_event_channel() -> (HubEventSender, HubEventReceiver) {
    hub_event_channel_with_capacity(DEFAULT_CHANNEL_BUFFER)
}

/// Create the forward queue with a custom buffer (at least one slot).
pub fn hub_event_channel_with_capacity(capacity: usize) -> (HubEventSender, HubEventReceiver) {
    mpsc::channel(capacity.max(1))
}
