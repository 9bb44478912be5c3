use super::{ConnectionId, HubInner};
use bytes::Bytes;
use futures_util::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// The read side of a live stream.
///
/// Yields encoded frames in the order they were written. The stream ends once
/// the hub removes the connection (after the buffered frames are drained).
/// Dropping a `Subscription` is the client-closed path: the connection is
/// unregistered and its heartbeat stops.
pub struct Subscription {
    id: ConnectionId,
    frames: mpsc::Receiver<Bytes>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub(super) fn new(id: ConnectionId, frames: mpsc::Receiver<Bytes>, hub: Weak<HubInner>) -> Self {
        Self { id, frames, hub }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }
}

impl Stream for Subscription {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().frames.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        if hub.remove(&self.id) {
            tracing::debug!(connection_id = %self.id, "stream closed by client");
        }
    }
}
