//! In-process registry of live event streams.
//!
//! [`EventHub`] owns one entry per open stream and fans events out to them.
//! Every write goes through a bounded per-connection buffer: a write that
//! cannot be accepted (receiver gone, or a stalled client with a full buffer)
//! removes that connection and never affects the others.
//!
//! Connections leave the registry in exactly three ways, all funnelled
//! through [`HubInner::remove`]:
//!
//! 1. the [`Subscription`] is dropped (client went away),
//! 2. a write to it fails (broadcast, direct send or heartbeat),
//! 3. the server closes it ([`EventHub::close`] / [`EventHub::shutdown`]).

mod connection;
mod subscription;

pub use connection::{ConnectionId, ConnectionInfo, WriteError};
pub use subscription::Subscription;

use bblabel_sdk::sse::{CLOSING_FRAME, PING_FRAME, connected_frame, encode_frame};
use bytes::Bytes;
use connection::Connection;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default interval between keep-alive frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Shortest heartbeat period a hub accepts; zero would never tick.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Default number of frames buffered per connection.
pub const DEFAULT_SINK_CAPACITY: usize = 64;

/// Tuning knobs for an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    pub heartbeat_interval: Duration,
    /// Frames a slow client may fall behind before it is dropped.
    pub sink_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

/// Outcome of a [`EventHub::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that accepted the frame.
    pub delivered: usize,
    /// Connections removed because the write failed.
    pub dropped: usize,
}

/// Handle to the stream registry. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

pub(crate) struct HubInner {
    config: HubConfig,
    registry: Mutex<HashMap<ConnectionId, Connection>>,
}

impl HubInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        // Nothing panics while holding the lock; recover the map if that ever changes.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a connection. Returns whether this call removed it.
    pub(crate) fn remove(&self, id: &ConnectionId) -> bool {
        let removed = self.registry().remove(id);
        // The guard is released here; dropping the connection aborts its heartbeat.
        removed.is_some()
    }

    /// Write a frame to one connection, removing it on failure.
    fn write(&self, id: &ConnectionId, frame: Bytes) -> bool {
        let result = match self.registry().get(id) {
            Some(connection) => connection.try_write(frame),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(connection_id = %id, error = %e, "dropping stream after failed write");
                self.remove(id);
                false
            }
        }
    }
}

impl EventHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config: HubConfig {
                    heartbeat_interval: config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL),
                    // The acknowledgement frame needs one slot of its own.
                    sink_capacity: config.sink_capacity.max(2),
                },
                registry: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> HubConfig {
        self.inner.config
    }

    /// Register a new stream, optionally scoped to one shop.
    ///
    /// The returned subscription already holds the `connected:<id>`
    /// acknowledgement, and a heartbeat task starts writing keep-alives after
    /// one interval. Must be called from within a tokio runtime.
    pub fn subscribe(&self, shop: Option<String>) -> Subscription {
        let shop = shop.filter(|s| !s.is_empty());
        let (sink, frames) = mpsc::channel(self.inner.config.sink_capacity);

        let mut registry = self.inner.registry();
        let id = loop {
            let candidate = ConnectionId::generate();
            if !registry.contains_key(&candidate) {
                break candidate;
            }
        };

        // Fresh channel with capacity >= 2, this cannot fail.
        let _ = sink.try_send(Bytes::from(connected_frame(id.as_str())));

        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::downgrade(&self.inner),
            id.clone(),
            self.inner.config.heartbeat_interval,
        ))
        .abort_handle();

        registry.insert(id.clone(), Connection::new(shop.clone(), sink, heartbeat));
        let total = registry.len();
        drop(registry);

        info!(connection_id = %id, shop = ?shop, total, "stream opened");
        Subscription::new(id, frames, Arc::downgrade(&self.inner))
    }

    /// Remove a stream. Unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: &ConnectionId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            debug!(connection_id = %id, "stream unsubscribed");
        }
        removed
    }

    /// Send a named event to every matching stream.
    ///
    /// With `shop = None` every stream receives it. With `shop = Some(s)`
    /// streams tagged `s` and untagged streams receive it.
    pub fn broadcast(&self, kind: &str, data: &Value, shop: Option<&str>) -> BroadcastReport {
        let shop = shop.filter(|s| !s.is_empty());
        let frame = Bytes::from(encode_frame(Some(kind), data));

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let registry = self.inner.registry();
            for (id, connection) in registry.iter() {
                if !connection.accepts(shop) {
                    continue;
                }
                match connection.try_write(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!(connection_id = %id, error = %e, "dropping stream after failed write");
                        failed.push(id.clone());
                    }
                }
            }
        }

        for id in &failed {
            self.inner.remove(id);
        }

        debug!(event = kind, shop = ?shop, delivered, dropped = failed.len(), "broadcast");
        BroadcastReport {
            delivered,
            dropped: failed.len(),
        }
    }

    /// Send a named event to a single stream. Returns `false` if the stream
    /// is unknown or the write failed (in which case it was removed).
    pub fn send_to_one(&self, id: &ConnectionId, kind: &str, data: &Value) -> bool {
        self.inner
            .write(id, Bytes::from(encode_frame(Some(kind), data)))
    }

    /// Close a stream from the server side.
    ///
    /// The `: closing` comment is written best-effort before the stream ends.
    pub fn close(&self, id: &ConnectionId) -> bool {
        let Some(connection) = self.inner.registry().remove(id) else {
            return false;
        };
        let _ = connection.try_write(Bytes::from_static(CLOSING_FRAME.as_bytes()));
        info!(connection_id = %id, "stream closed by server");
        true
    }

    /// Close every open stream.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.inner.registry().drain().collect();
        let count = drained.len();
        for (_, connection) in drained {
            let _ = connection.try_write(Bytes::from_static(CLOSING_FRAME.as_bytes()));
        }
        info!(count, "closed all streams");
    }

    pub fn len(&self) -> usize {
        self.inner.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry().is_empty()
    }

    /// Snapshot of the open streams, oldest first.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let mut infos: Vec<_> = self
            .inner
            .registry()
            .iter()
            .map(|(id, connection)| ConnectionInfo {
                id: id.clone(),
                shop: connection.shop.clone(),
                connected_at: connection.connected_at,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

async fn heartbeat_loop(hub: Weak<HubInner>, id: ConnectionId, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(hub) = hub.upgrade() else {
            break;
        };
        if !hub.write(&id, Bytes::from_static(PING_FRAME.as_bytes())) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bblabel_sdk::sse::{SseDecoder, SseMessage};
    use futures_util::{FutureExt, StreamExt};
    use serde_json::json;
    use std::collections::HashSet;

    fn next_frame(sub: &mut Subscription) -> Option<String> {
        match sub.next().now_or_never() {
            Some(Some(Ok(bytes))) => Some(String::from_utf8(bytes.to_vec()).unwrap()),
            _ => None,
        }
    }

    /// Skip the acknowledgement frame.
    fn skip_ack(sub: &mut Subscription) {
        let ack = next_frame(sub).unwrap();
        assert_eq!(ack, format!("data: connected:{}\n\n", sub.id()));
    }

    fn small_hub(capacity: usize) -> EventHub {
        EventHub::new(HubConfig {
            sink_capacity: capacity,
            ..HubConfig::default()
        })
    }

    #[tokio::test]
    async fn subscribe_ids_are_distinct() {
        let hub = EventHub::default();
        let subs: Vec<_> = (0..200).map(|_| hub.subscribe(None)).collect();
        let ids: HashSet<_> = subs.iter().map(|s| s.id().clone()).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(hub.len(), 200);
    }

    #[tokio::test]
    async fn unscoped_broadcast_reaches_every_stream() {
        let hub = EventHub::default();
        let mut a = hub.subscribe(Some("a.myshopify.com".into()));
        let mut b = hub.subscribe(Some("b.myshopify.com".into()));
        let mut untagged = hub.subscribe(None);
        for sub in [&mut a, &mut b, &mut untagged] {
            skip_ack(sub);
        }

        let report = hub.broadcast("product_updated", &json!({"id": 7}), None);
        assert_eq!(report, BroadcastReport { delivered: 3, dropped: 0 });

        for sub in [&mut a, &mut b, &mut untagged] {
            assert_eq!(
                next_frame(sub).unwrap(),
                "event: product_updated\ndata: {\"id\":7}\n\n"
            );
        }
    }

    #[tokio::test]
    async fn scoped_broadcast_skips_other_shops() {
        let hub = EventHub::default();
        let mut a = hub.subscribe(Some("a.myshopify.com".into()));
        let mut b = hub.subscribe(Some("b.myshopify.com".into()));
        let mut untagged = hub.subscribe(None);
        for sub in [&mut a, &mut b, &mut untagged] {
            skip_ack(sub);
        }

        let report = hub.broadcast("product_created", &json!({"id": 1}), Some("a.myshopify.com"));
        assert_eq!(report.delivered, 2);

        assert!(next_frame(&mut a).is_some());
        assert!(next_frame(&mut untagged).is_some());
        assert!(next_frame(&mut b).is_none());
    }

    #[tokio::test]
    async fn empty_scope_counts_as_unscoped() {
        let hub = EventHub::default();
        let mut b = hub.subscribe(Some("b.myshopify.com".into()));
        skip_ack(&mut b);
        assert_eq!(hub.broadcast("product_created", &json!({}), Some("")).delivered, 1);
    }

    #[tokio::test]
    async fn stalled_stream_is_removed_and_others_still_receive() {
        let hub = small_hub(2);
        let mut stalled = hub.subscribe(None);
        let mut healthy = hub.subscribe(None);
        skip_ack(&mut healthy);

        // The stalled buffer now holds the ack plus this frame.
        assert_eq!(hub.broadcast("product_created", &json!(1), None).delivered, 2);
        assert!(next_frame(&mut healthy).is_some());

        let report = hub.broadcast("product_created", &json!(2), None);
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.connections()[0].id, *healthy.id());
        assert_eq!(
            next_frame(&mut healthy).unwrap(),
            "event: product_created\ndata: 2\n\n"
        );

        // Buffered frames drain, then the stream ends.
        assert!(next_frame(&mut stalled).unwrap().starts_with("data: connected:"));
        assert!(next_frame(&mut stalled).unwrap().ends_with("data: 1\n\n"));
        assert!(matches!(stalled.next().now_or_never(), Some(None)));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = EventHub::default();
        let sub = hub.subscribe(None);
        let _other = hub.subscribe(None);
        let id = sub.id().clone();

        assert!(hub.unsubscribe(&id));
        assert_eq!(hub.len(), 1);
        assert!(!hub.unsubscribe(&id));
        assert!(!hub.unsubscribe(&ConnectionId::from("missing".to_string())));
        assert_eq!(hub.len(), 1);

        drop(sub);
        assert_eq!(hub.len(), 1);
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters() {
        let hub = EventHub::default();
        let sub = hub.subscribe(Some("a.myshopify.com".into()));
        assert_eq!(hub.len(), 1);
        drop(sub);
        assert!(hub.is_empty());
        assert_eq!(hub.broadcast("product_created", &json!({}), None).delivered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_arrives_after_interval() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe(None);
        skip_ack(&mut sub);

        let started = Instant::now();
        let frame = sub.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], PING_FRAME.as_bytes());
        assert!(started.elapsed() >= DEFAULT_HEARTBEAT_INTERVAL);

        let mut decoder = SseDecoder::new();
        let messages = decoder.feed(&frame).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_ping());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_heartbeat_interval_is_clamped() {
        let hub = EventHub::new(HubConfig {
            heartbeat_interval: Duration::ZERO,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        });
        assert_eq!(hub.config().heartbeat_interval, MIN_HEARTBEAT_INTERVAL);

        let mut sub = hub.subscribe(None);
        skip_ack(&mut sub);
        let frame = sub.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], PING_FRAME.as_bytes());
        assert_eq!(hub.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_failure_removes_stalled_stream() {
        let hub = small_hub(2);
        let _stalled = hub.subscribe(None);
        // Ack and first ping fill the buffer, the second ping fails.
        tokio::time::sleep(DEFAULT_HEARTBEAT_INTERVAL * 2 + Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn close_writes_closing_frame_and_ends_stream() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe(None);
        skip_ack(&mut sub);
        let id = sub.id().clone();

        assert!(hub.close(&id));
        assert!(!hub.close(&id));
        assert!(hub.is_empty());
        assert_eq!(next_frame(&mut sub).unwrap(), CLOSING_FRAME);
        assert!(matches!(sub.next().now_or_never(), Some(None)));
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let hub = EventHub::default();
        let mut subs: Vec<_> = (0..3).map(|_| hub.subscribe(None)).collect();
        hub.shutdown();
        assert!(hub.is_empty());
        for sub in &mut subs {
            skip_ack(sub);
            assert_eq!(next_frame(sub).unwrap(), CLOSING_FRAME);
            assert!(matches!(sub.next().now_or_never(), Some(None)));
        }
    }

    #[tokio::test]
    async fn send_to_one_targets_a_single_stream() {
        let hub = EventHub::default();
        let mut target = hub.subscribe(None);
        let mut bystander = hub.subscribe(None);
        skip_ack(&mut target);
        skip_ack(&mut bystander);

        assert!(hub.send_to_one(target.id(), "notice", &json!("hi")));
        assert_eq!(next_frame(&mut target).unwrap(), "event: notice\ndata: hi\n\n");
        assert!(next_frame(&mut bystander).is_none());
        assert!(!hub.send_to_one(&ConnectionId::from("missing".to_string()), "notice", &json!(null)));
    }

    #[tokio::test]
    async fn scoped_delivery_end_to_end() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe(Some("a.myshopify.com".into()));
        let mut decoder = SseDecoder::new();

        hub.broadcast("product_created", &json!({"id": 1}), Some("b.myshopify.com"));
        hub.broadcast("product_created", &json!({"id": 1}), Some("a.myshopify.com"));

        let mut messages = Vec::new();
        while let Some(frame) = next_frame(&mut sub) {
            messages.extend(decoder.feed(frame.as_bytes()).unwrap());
        }
        assert_eq!(
            messages,
            vec![
                SseMessage::Event {
                    event: None,
                    data: format!("connected:{}", sub.id()),
                },
                SseMessage::Event {
                    event: Some("product_created".into()),
                    data: "{\"id\":1}".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn connections_snapshot_lists_open_streams() {
        let hub = EventHub::default();
        let a = hub.subscribe(Some("a.myshopify.com".into()));
        let b = hub.subscribe(None);
        let infos = hub.connections();
        assert_eq!(infos.len(), 2);
        let shops: HashSet<_> = infos.iter().map(|i| (i.id.clone(), i.shop.clone())).collect();
        assert!(shops.contains(&(a.id().clone(), Some("a.myshopify.com".into()))));
        assert!(shops.contains(&(b.id().clone(), None)));
    }
}
