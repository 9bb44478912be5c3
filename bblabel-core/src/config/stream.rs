use crate::events::DEFAULT_CHANNEL_BUFFER;
use crate::hub::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_SINK_CAPACITY, HubConfig};
use std::time::Duration;

/// Live-update stream settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub heartbeat_interval: Duration,
    /// Frames buffered per connection before a slow client is dropped.
    pub channel_capacity: usize,
    /// Broadcasts queued between webhook handlers and the forwarder.
    pub forward_queue: usize,
}

impl StreamConfig {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            heartbeat_interval: self.heartbeat_interval,
            sink_capacity: self.channel_capacity,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            channel_capacity: DEFAULT_SINK_CAPACITY,
            forward_queue: DEFAULT_CHANNEL_BUFFER,
        }
    }
}
