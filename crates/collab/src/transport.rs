//! Transport seam and wire format for document channels.
//!
//! Every document gets its own named channel (`collab:doc:{id}`). Events on
//! a channel are serialized [`WireEnvelope`]s carrying a [`ChannelEvent`].
//! The transport itself is an injected trait object, so callers decide how
//! payloads actually move; [`MemoryTransport`] is the in-process hub used by
//! tests and single-machine setups.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use ot_engine::{CollaboratorId, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::{CollabError, CollabResult};
use crate::typing::CollaboratorProfile;

/// Wire format version stamped into every envelope. Bumped on breaking
/// changes to the payload layout.
pub const WIRE_VERSION: u32 = 1;

// ========== Channel Naming ==========

/// Identifies a single shared document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named transport channel. All traffic for one document flows over the
/// channel returned by [`ChannelId::document`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// The canonical channel for a document: `collab:doc:{id}`.
    pub fn document(document: &DocumentId) -> Self {
        Self(format!("collab:doc:{}", document))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ========== Wire Format ==========

/// Everything that travels over a document channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ChannelEvent {
    /// A text operation authored by some collaborator.
    #[serde(rename = "operation")]
    Operation(Operation),

    /// A collaborator started typing.
    #[serde(rename = "typing:start")]
    TypingStart(CollaboratorProfile),

    /// A collaborator stopped typing (explicitly or via idle timeout).
    #[serde(rename = "typing:stop")]
    TypingStop { collaborator: CollaboratorId },
}

impl ChannelEvent {
    /// The wire tag for this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChannelEvent::Operation(_) => "operation",
            ChannelEvent::TypingStart(_) => "typing:start",
            ChannelEvent::TypingStop { .. } => "typing:stop",
        }
    }
}

/// Versioned wrapper around a [`ChannelEvent`], the unit actually placed on
/// the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Wire format version, see [`WIRE_VERSION`].
    pub v: u32,
    #[serde(flatten)]
    pub event: ChannelEvent,
}

impl WireEnvelope {
    pub fn new(event: ChannelEvent) -> Self {
        Self {
            v: WIRE_VERSION,
            event,
        }
    }

    /// Serialize for publishing.
    pub fn encode(&self) -> CollabResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CollabError::SerializationError(e.to_string()))
    }

    /// Parse a received payload. The version field is checked before the
    /// event body so a newer peer produces a clear error instead of an
    /// unknown-variant parse failure.
    pub fn decode(bytes: &[u8]) -> CollabResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CollabError::SerializationError(e.to_string()))?;
        let found = value
            .get("v")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CollabError::SerializationError("missing wire version".to_string()))?;
        let found = u32::try_from(found).unwrap_or(u32::MAX);
        if found > WIRE_VERSION {
            return Err(CollabError::UnsupportedWireVersion {
                found,
                supported: WIRE_VERSION,
            });
        }
        serde_json::from_value(value).map_err(|e| CollabError::SerializationError(e.to_string()))
    }
}

// ========== Transport Seam ==========

/// Errors surfaced by a transport backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has been shut down and accepts no further traffic.
    #[error("Transport is closed")]
    Closed,

    /// Backend-specific failure, stringified.
    #[error("Transport backend error: {0}")]
    Backend(String),
}

/// Moves opaque payloads between subscribers of named channels.
///
/// Implementations must be cheap to share behind an [`Arc`]; editors and
/// typing indicators hold one handle each and never assume exclusive
/// ownership.
pub trait Transport: Send + Sync {
    /// Deliver `payload` to every current subscriber of `channel`.
    fn publish(&self, channel: &ChannelId, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Open a subscription receiving every payload published to `channel`
    /// after this call returns. Earlier traffic is not replayed.
    fn subscribe(&self, channel: &ChannelId) -> Result<Subscription, TransportError>;
}

/// Receiving end of a channel subscription.
#[derive(Debug)]
pub struct Subscription {
    channel: ChannelId,
    receiver: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Subscription {
    pub fn new(channel: ChannelId, receiver: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            channel,
            receiver: Some(receiver),
        }
    }

    /// The channel this subscription is attached to.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Take the next buffered payload without waiting, if any.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.as_mut().and_then(|rx| rx.try_recv().ok())
    }

    /// Wait for the next payload. Returns `None` once the subscription is
    /// closed and drained.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        match self.receiver.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Detach from the channel. Safe to call more than once.
    pub fn close(&mut self) {
        self.receiver = None;
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}

// ========== In-Memory Hub ==========

/// In-process [`Transport`] fanning published payloads out to every live
/// subscriber of the same channel.
///
/// # Thread Safety
///
/// The subscriber table is guarded by an `RwLock`; publishing and
/// subscribing are safe from any thread or task.
pub struct MemoryTransport {
    subscribers: RwLock<HashMap<ChannelId, Vec<mpsc::UnboundedSender<Vec<u8>>>>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// A transport handle ready to be cloned into editors and indicators.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Shut the hub down. Subsequent publishes and subscribes fail with
    /// [`TransportError::Closed`]; existing subscriptions see no further
    /// payloads.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.write().unwrap().clear();
    }

    /// Number of live subscriptions on `channel`. Dropped receivers are
    /// pruned before counting.
    pub fn subscriber_count(&self, channel: &ChannelId) -> usize {
        let mut subscribers = self.subscribers.write().unwrap();
        match subscribers.get_mut(channel) {
            Some(senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            }
            None => 0,
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, channel: &ChannelId, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let mut subscribers = self.subscribers.write().unwrap();
        if let Some(senders) = subscribers.get_mut(channel) {
            senders.retain(|tx| tx.send(payload.clone()).is_ok());
            if senders.is_empty() {
                subscribers.remove(channel);
            }
        }
        Ok(())
    }

    fn subscribe(&self, channel: &ChannelId) -> Result<Subscription, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .unwrap()
            .entry(channel.clone())
            .or_default()
            .push(tx);
        Ok(Subscription::new(channel.clone(), rx))
    }
}
