//! Collaboration features for real-time text editing.
//!
//! This crate wires the transformation engine from `ot_engine` to named
//! transport channels: editors broadcast local operations and fold in remote
//! ones, typing indicators share presence, and conflict strategies reconcile
//! copies that diverged offline.
//!
//! # Modules
//!
//! - `editor`: Per-collaborator editing session bound to a document channel
//! - `transport`: Transport seam, wire format, and the in-memory hub
//! - `typing`: Typing presence with idle timeout
//! - `conflict`: Conflict resolution for divergent document copies
//! - `error`: Error types for the collaboration crate
//!
//! # Example
//!
//! ```
//! use collab::{CollaborativeEditor, DocumentId, MemoryTransport};
//! use ot_engine::CollaboratorId;
//!
//! # fn main() -> collab::CollabResult<()> {
//! // One shared transport, one editor per collaborator
//! let transport = MemoryTransport::shared();
//! let document = DocumentId::new("design-notes");
//!
//! let mut alice = CollaborativeEditor::with_content(
//!     document.clone(),
//!     CollaboratorId::new("alice"),
//!     transport.clone(),
//!     "Hello world",
//! )?;
//! let mut bob = CollaborativeEditor::with_content(
//!     document,
//!     CollaboratorId::new("bob"),
//!     transport.clone(),
//!     "Hello world",
//! )?;
//!
//! // Alice edits; Bob drains his channel and converges
//! alice.insert(5, " there");
//! bob.process_incoming();
//! assert_eq!(bob.content(), "Hello there world");
//! # Ok(())
//! # }
//! ```

pub mod conflict;
pub mod editor;
pub mod error;
pub mod transport;
pub mod typing;

// Re-export commonly used types
pub use conflict::{ConflictResolver, DocumentSnapshot, Stamped, Versioned};
pub use editor::{CollaborativeEditor, ContentChangeCallback};
pub use error::{CollabError, CollabResult};
pub use transport::{
    ChannelEvent, ChannelId, DocumentId, MemoryTransport, Subscription, Transport, TransportError,
    WireEnvelope, WIRE_VERSION,
};
pub use typing::{CollaboratorProfile, TypingConfig, TypingIndicator, DEFAULT_IDLE_TIMEOUT_MS};
