use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Opaque identifier of a live stream.
///
/// Backed by a time-ordered UUID so that ids sort by connect time in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Why a frame could not be handed to a connection's sink.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    #[error("stream receiver is gone")]
    Closed,
    #[error("stream buffer is full")]
    Full,
}

/// A registry entry. Dropping it stops the heartbeat.
pub(crate) struct Connection {
    pub(crate) shop: Option<String>,
    pub(crate) connected_at: OffsetDateTime,
    sink: mpsc::Sender<Bytes>,
    heartbeat: AbortHandle,
}

impl Connection {
    pub(crate) fn new(
        shop: Option<String>,
        sink: mpsc::Sender<Bytes>,
        heartbeat: AbortHandle,
    ) -> Self {
        Self {
            shop,
            connected_at: OffsetDateTime::now_utc(),
            sink,
            heartbeat,
        }
    }

    pub(crate) fn try_write(&self, frame: Bytes) -> Result<(), WriteError> {
        self.sink.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WriteError::Full,
            mpsc::error::TrySendError::Closed(_) => WriteError::Closed,
        })
    }

    /// Unscoped events reach everyone; scoped events reach matching and untagged connections.
    pub(crate) fn accepts(&self, scope: Option<&str>) -> bool {
        match (scope, self.shop.as_deref()) {
            (Some(scope), Some(own)) => scope == own,
            _ => true,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

/// Read-only snapshot of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub shop: Option<String>,
    pub connected_at: OffsetDateTime,
}

impl From<&ConnectionInfo> for bblabel_sdk::objects::ConnectionInfoResponse {
    fn from(value: &ConnectionInfo) -> Self {
        Self {
            id: value.id.to_string(),
            shop: value.shop.clone(),
            connected_at: value.connected_at.unix_timestamp(),
        }
    }
}
