//! Background processors.
//!
//! - `EventForwarder`: Receives `HubEvent`, broadcasts through the `EventHub`

pub mod event_forwarder;

pub use event_forwarder::{Broadcast, EventForwarder, ForwardError};
