//! Operational transformation core for concurrent text editing.
//!
//! This crate implements the conflict-resolution engine that lets multiple
//! collaborators edit the same flat text document at the same time. Each
//! collaborator runs one [`OtEngine`] per document; local edits apply
//! immediately, remote edits are transformed against the collaborator's own
//! in-flight operations before they touch the document, and every engine
//! that sees the same set of operations converges on the same content.
//!
//! # Modules
//!
//! - `operation`: the edit operation value type and collaborator identity
//! - `transform`: the pure pairwise transform function
//! - `engine`: document state, version tracking, and the pending queue
//!
//! # Example
//!
//! ```
//! use ot_engine::{CollaboratorId, Operation, OtEngine};
//!
//! let alice = CollaboratorId::new("alice");
//! let mut engine = OtEngine::with_content(alice.clone(), "Hello world");
//!
//! let op = Operation::insert(5, " there", alice, engine.version() + 1);
//! engine.apply_local(op);
//!
//! assert_eq!(engine.content(), "Hello there world");
//! assert_eq!(engine.version(), 1);
//! ```

pub mod engine;
pub mod operation;
pub mod transform;

// Re-export commonly used types
pub use engine::{DocumentState, OtEngine};
pub use operation::{current_timestamp_ms, CollaboratorId, OpKind, Operation};
pub use transform::transform;
