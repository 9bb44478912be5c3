//! EventForwarder processor.
//!
//! The EventForwarder is responsible for:
//! - Receiving `HubEvent` from the forward queue
//! - Broadcasting it through the `EventHub`
//! - Containing any failure so that one bad event never stops the loop
//!
//! Webhook handlers enqueue with `try_send` and answer immediately, so the
//! broadcast never delays the platform's delivery.

use crate::events::{HubEvent, HubEventReceiver};
use crate::hub::{BroadcastReport, EventHub};
use kanau::processor::Processor;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("broadcast of `{kind}` panicked: {message}")]
    Panicked { kind: String, message: String },
}

/// Where forwarded events are delivered.
pub trait Broadcast: Send + Sync + 'static {
    fn broadcast(&self, kind: &str, data: &Value, shop: Option<&str>) -> BroadcastReport;
}

impl Broadcast for EventHub {
    fn broadcast(&self, kind: &str, data: &Value, shop: Option<&str>) -> BroadcastReport {
        EventHub::broadcast(self, kind, data, shop)
    }
}

/// Drains the forward queue into the hub.
pub struct EventForwarder<H = EventHub> {
    hub: H,
    event_rx: HubEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl<H: Broadcast> EventForwarder<H> {
    pub fn new(hub: H, event_rx: HubEventReceiver, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            hub,
            event_rx,
            shutdown_rx,
        }
    }

    /// Run until shutdown is signalled or every sender is gone.
    pub async fn run(mut self) {
        info!("EventForwarder started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("EventForwarder received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.event_rx.recv() => {
                    debug!(event = %event.kind, shop = ?event.shop, "Received HubEvent");
                    match self.process(event).await {
                        Ok(report) => debug!(
                            delivered = report.delivered,
                            dropped = report.dropped,
                            "HubEvent forwarded"
                        ),
                        Err(e) => error!(error = %e, "Failed to forward HubEvent"),
                    }
                }

                else => {
                    info!("HubEvent channel closed");
                    break;
                }
            }
        }

        info!("EventForwarder shutdown complete");
    }
}

impl<H: Broadcast> Processor<HubEvent> for EventForwarder<H> {
    type Output = BroadcastReport;
    type Error = ForwardError;

    async fn process(&self, event: HubEvent) -> Result<BroadcastReport, ForwardError> {
        let HubEvent { kind, data, shop } = event;
        catch_unwind(AssertUnwindSafe(|| {
            self.hub.broadcast(&kind, &data, shop.as_deref())
        }))
        .map_err(|payload| ForwardError::Panicked {
            message: panic_message(payload.as_ref()),
            kind,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
