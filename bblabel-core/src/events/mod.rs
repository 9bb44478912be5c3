//! Events flowing from webhook ingestion to the hub.
//!
//! # Event Flow
//!
//! 1. A webhook handler authenticates a product webhook and enqueues a
//!    `HubEvent` without waiting.
//! 2. `EventForwarder` drains the queue and calls `EventHub::broadcast`.
//!
//! Events are ephemeral and never persisted.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, HubEventReceiver, HubEventSender, hub_event_channel,
    hub_event_channel_with_capacity,
};
pub use types::HubEvent;
