//! Document state and the per-collaborator transformation engine
//!
//! One [`OtEngine`] serves one collaborator on one document. Local edits
//! apply immediately and bump the version by one; remote edits are folded
//! through the collaborator's own pending operations, in submission order,
//! before they touch the content, and versions merge by maximum. Nothing is
//! ever rejected: positions and lengths outside the current content are
//! clamped with a debug log, so a degraded or hostile peer can never crash a
//! healthy engine.

use crate::operation::{CollaboratorId, OpKind, Operation};
use crate::transform::transform;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Materialized state of one document replica.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Current text
    pub content: String,
    /// Monotonically non-decreasing version counter
    pub version: u64,
    /// Applied operations in application order. In-memory debugging aid,
    /// not a replay source.
    pub operations: Vec<Operation>,
}

/// Per-collaborator OT engine: one document, one pending queue.
///
/// The engine owns its [`DocumentState`] exclusively; nothing else mutates
/// the content. Every method is a synchronous in-memory state transition.
pub struct OtEngine {
    collaborator: CollaboratorId,
    state: DocumentState,
    pending: VecDeque<Operation>,
}

impl OtEngine {
    /// Create an engine over an empty document at version 0.
    pub fn new(collaborator: CollaboratorId) -> Self {
        Self::with_content(collaborator, "")
    }

    /// Create an engine seeded with existing content at version 0.
    pub fn with_content(collaborator: CollaboratorId, content: impl Into<String>) -> Self {
        Self {
            collaborator,
            state: DocumentState {
                content: content.into(),
                ..Default::default()
            },
            pending: VecDeque::new(),
        }
    }

    /// The local collaborator this engine belongs to.
    pub fn collaborator(&self) -> &CollaboratorId {
        &self.collaborator
    }

    /// Current document text.
    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Current document version.
    pub fn version(&self) -> u64 {
        self.state.version
    }

    /// The full replica state.
    pub fn document(&self) -> &DocumentState {
        &self.state
    }

    /// Applied operations in application order.
    pub fn operation_log(&self) -> &[Operation] {
        &self.state.operations
    }

    /// Apply the local collaborator's own operation.
    ///
    /// The author's edit is authoritative against its own history, so no
    /// transform happens here. Increments the version by exactly one.
    pub fn apply_local(&mut self, op: Operation) {
        self.apply_to_content(&op);
        self.state.version += 1;
        tracing::debug!(
            "applied local {} at {} by {} (version {})",
            op.kind_name(),
            op.position,
            self.collaborator,
            self.state.version
        );
        self.state.operations.push(op);
    }

    /// Apply an operation received from another collaborator.
    ///
    /// The incoming operation is transformed against every pending local
    /// operation in submission order, then applied. The version merges by
    /// maximum rather than incrementing. Returns the operation as applied.
    pub fn apply_remote(&mut self, op: Operation) -> Operation {
        let incoming_position = op.position;
        let transformed = self
            .pending
            .iter()
            .fold(op, |acc, pending| transform(&acc, pending));
        if transformed.position != incoming_position {
            tracing::debug!(
                "transformed remote {} from position {} to {} against {} pending ops",
                transformed.kind_name(),
                incoming_position,
                transformed.position,
                self.pending.len()
            );
        }
        self.apply_to_content(&transformed);
        self.state.version = self.state.version.max(transformed.version);
        tracing::debug!(
            "applied remote {} from {} (version {})",
            transformed.kind_name(),
            transformed.origin,
            self.state.version
        );
        self.state.operations.push(transformed.clone());
        transformed
    }

    /// Queue a broadcast local operation for replay against incoming
    /// remote operations.
    pub fn add_pending(&mut self, op: Operation) {
        self.pending.push_back(op);
    }

    /// Drop the whole pending queue. When to consider the queue settled is
    /// the caller's policy.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Number of queued pending operations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether any local operations are still pending.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Splice one operation into the content, clamping anything that falls
    /// outside the current text.
    fn apply_to_content(&mut self, op: &Operation) {
        match &op.kind {
            OpKind::Insert { content } => {
                let doc_chars = self.state.content.chars().count();
                let position = if op.position > doc_chars {
                    tracing::debug!(
                        "clamping insert position {} to document end {}",
                        op.position,
                        doc_chars
                    );
                    doc_chars
                } else {
                    op.position
                };
                let at = byte_offset(&self.state.content, position);
                self.state.content.insert_str(at, content);
            }
            OpKind::Delete { length } => {
                let doc_chars = self.state.content.chars().count();
                let position = op.position.min(doc_chars);
                let effective = (*length).min(doc_chars - position);
                if position != op.position || effective != *length {
                    tracing::debug!(
                        "clamping delete at {} len {} to at {} len {} (document length {})",
                        op.position,
                        length,
                        position,
                        effective,
                        doc_chars
                    );
                }
                if effective > 0 {
                    let start = byte_offset(&self.state.content, position);
                    let end = byte_offset(&self.state.content, position + effective);
                    self.state.content.replace_range(start..end, "");
                }
            }
            OpKind::Retain => {}
        }
    }
}

/// Byte offset of the `char_pos`-th character, or the end of the string.
fn byte_offset(content: &str, char_pos: usize) -> usize {
    content
        .char_indices()
        .nth(char_pos)
        .map(|(offset, _)| offset)
        .unwrap_or(content.len())
}
