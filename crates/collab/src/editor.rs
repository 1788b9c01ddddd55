//! Collaborative editor facade
//!
//! Binds one transformation engine to one document channel. Local edits are
//! applied, queued as pending, and broadcast; incoming payloads are decoded
//! and folded in through the engine's remote path. One instance per
//! collaborator per document.

use std::sync::Arc;

use ot_engine::{CollaboratorId, Operation, OtEngine};

use crate::error::CollabResult;
use crate::transport::{
    ChannelEvent, ChannelId, DocumentId, Subscription, Transport, WireEnvelope,
};

/// Observer invoked with the full document text after each applied change.
pub type ContentChangeCallback = Box<dyn FnMut(&str) + Send>;

/// A collaborator's live editing session on one document.
pub struct CollaborativeEditor {
    /// Document this editor is bound to.
    document_id: DocumentId,
    /// Channel carrying this document's traffic.
    channel: ChannelId,
    /// Local transformation engine.
    engine: OtEngine,
    /// Caller-owned transport, shared with other components.
    transport: Arc<dyn Transport>,
    /// Live channel subscription; `None` once destroyed.
    subscription: Option<Subscription>,
    /// Observer for content changes.
    on_content_change: Option<ContentChangeCallback>,
}

impl CollaborativeEditor {
    /// Open an editing session on an empty document. Subscribes to the
    /// document channel immediately.
    pub fn new(
        document: DocumentId,
        collaborator: CollaboratorId,
        transport: Arc<dyn Transport>,
    ) -> CollabResult<Self> {
        Self::with_content(document, collaborator, transport, "")
    }

    /// Open an editing session seeded with existing content at version 0.
    pub fn with_content(
        document: DocumentId,
        collaborator: CollaboratorId,
        transport: Arc<dyn Transport>,
        content: impl Into<String>,
    ) -> CollabResult<Self> {
        let channel = ChannelId::document(&document);
        let subscription = transport.subscribe(&channel)?;
        tracing::info!("Collaborator {} joined {}", collaborator, channel);
        Ok(Self {
            document_id: document,
            channel,
            engine: OtEngine::with_content(collaborator, content),
            transport,
            subscription: Some(subscription),
            on_content_change: None,
        })
    }

    // ========== Local Edits ==========

    /// Insert `text` at a character position. Applies locally, queues the
    /// operation as pending, broadcasts it, and returns it as broadcast.
    pub fn insert(&mut self, position: usize, text: impl Into<String>) -> Operation {
        let operation = Operation::insert(
            position,
            text,
            self.engine.collaborator().clone(),
            self.engine.version() + 1,
        );
        self.apply_and_broadcast(operation)
    }

    /// Delete `length` characters starting at a character position.
    pub fn delete(&mut self, position: usize, length: usize) -> Operation {
        let operation = Operation::delete(
            position,
            length,
            self.engine.collaborator().clone(),
            self.engine.version() + 1,
        );
        self.apply_and_broadcast(operation)
    }

    /// Replace a range with `text`, expressed as a delete followed by an
    /// insert. The two operations are broadcast separately, so peers can
    /// observe the intermediate deleted state between them.
    pub fn replace(
        &mut self,
        position: usize,
        length: usize,
        text: impl Into<String>,
    ) -> (Operation, Operation) {
        let deleted = self.delete(position, length);
        let inserted = self.insert(position, text);
        (deleted, inserted)
    }

    fn apply_and_broadcast(&mut self, operation: Operation) -> Operation {
        self.engine.apply_local(operation.clone());
        self.engine.add_pending(operation.clone());
        self.publish_operation(&operation);
        self.notify_content_changed();
        operation
    }

    /// Publishing is fire-and-forget: a transport failure is logged and the
    /// local edit stands. After `destroy` nothing is published.
    fn publish_operation(&mut self, operation: &Operation) {
        if self.subscription.is_none() {
            tracing::debug!(
                "Not publishing {} operation, editor left {}",
                operation.kind_name(),
                self.channel
            );
            return;
        }
        let envelope = WireEnvelope::new(ChannelEvent::Operation(operation.clone()));
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode operation for {}: {}", self.channel, e);
                return;
            }
        };
        if let Err(e) = self.transport.publish(&self.channel, payload) {
            tracing::warn!("Failed to publish operation to {}: {}", self.channel, e);
        }
    }

    // ========== Remote Edits ==========

    /// Drain the subscription without blocking and apply every remote
    /// operation found, skipping echoes of this collaborator's own
    /// operations and dropping undecodable payloads. Typing events are not
    /// the editor's concern. Returns the number of remote operations
    /// applied.
    pub fn process_incoming(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let bytes = match self.subscription.as_mut().and_then(|s| s.try_recv()) {
                Some(bytes) => bytes,
                None => break,
            };
            let envelope = match WireEnvelope::decode(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!("Dropping undecodable payload on {}: {}", self.channel, e);
                    continue;
                }
            };
            match envelope.event {
                ChannelEvent::Operation(operation) => {
                    if operation.origin == *self.engine.collaborator() {
                        tracing::debug!("Skipping echo of own {} operation", operation.kind_name());
                        continue;
                    }
                    self.engine.apply_remote(operation);
                    self.notify_content_changed();
                    applied += 1;
                }
                ChannelEvent::TypingStart(profile) => {
                    tracing::debug!("Ignoring typing:start from {}", profile.id);
                }
                ChannelEvent::TypingStop { collaborator } => {
                    tracing::debug!("Ignoring typing:stop from {}", collaborator);
                }
            }
        }
        applied
    }

    // ========== Observation and Lifecycle ==========

    /// Register the content-changed observer. It fires with the full new
    /// text after every applied local or remote operation.
    pub fn set_on_content_change(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_content_change = Some(Box::new(callback));
    }

    fn notify_content_changed(&mut self) {
        if let Some(callback) = self.on_content_change.as_mut() {
            callback(self.engine.content());
        }
    }

    /// Drop the pending queue. Whether pending operations count as settled
    /// is the caller's policy; see [`OtEngine::clear_pending`].
    pub fn clear_pending(&mut self) {
        self.engine.clear_pending();
    }

    /// Number of local operations still pending.
    pub fn pending_count(&self) -> usize {
        self.engine.pending_count()
    }

    /// End the channel binding: close and drop the subscription. Safe to
    /// call more than once. The engine stays usable for local edits, but
    /// nothing is sent or received afterwards.
    pub fn destroy(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
            tracing::info!(
                "Collaborator {} left {}",
                self.engine.collaborator(),
                self.channel
            );
        }
    }

    /// Whether `destroy` has run.
    pub fn is_destroyed(&self) -> bool {
        self.subscription.is_none()
    }

    // ========== Accessors ==========

    pub fn content(&self) -> &str {
        self.engine.content()
    }

    pub fn version(&self) -> u64 {
        self.engine.version()
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn collaborator(&self) -> &CollaboratorId {
        self.engine.collaborator()
    }
}
