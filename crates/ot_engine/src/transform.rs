//! Pairwise operational transform
//!
//! The transform answers one question: given that `against` has already been
//! applied to the document, how must `op` be adjusted so that it still edits
//! the characters its author meant? Both inputs carry positions relative to
//! the same base document; the output carries a position relative to the
//! document after `against`.
//!
//! # Rules
//!
//! - Insert/Insert: the smaller position wins; a position tie is broken by
//!   string comparison of the originating collaborator ids, never by
//!   timestamps or arrival order. The larger id shifts right.
//! - Insert/Delete: inserts at or before the deleted range stay put; inserts
//!   after it shift left, clamped to the start of the deletion.
//! - Delete/Insert: deletes before the insertion point stay put; deletes at
//!   or after it shift right.
//! - Delete/Delete: disjoint ranges shift, overlapping ranges shrink by the
//!   intersection and land at the surviving start, so deleting an
//!   already-deleted range degrades to a zero-length delete.
//! - Retain on either side changes nothing.
//!
//! Each call considers exactly one partner operation. Chains of three or
//! more mutually overlapping deletes are reconciled one pair at a time and
//! can keep more length than the true union would; the engine's apply-time
//! clamping absorbs the excess. See the tests pinning that boundary.

use crate::operation::{OpKind, Operation};

/// Adjust `op` to apply after `against` has already been applied.
///
/// Pure and side-effect free: returns a new operation, never mutates either
/// input, and leaves `origin`, `timestamp_ms`, and `version` untouched.
pub fn transform(op: &Operation, against: &Operation) -> Operation {
    match (&op.kind, &against.kind) {
        (OpKind::Insert { .. }, OpKind::Insert { content }) => {
            if op.position < against.position
                || (op.position == against.position && op.origin < against.origin)
            {
                op.clone()
            } else {
                let mut shifted = op.clone();
                shifted.position += content.chars().count();
                shifted
            }
        }

        (OpKind::Insert { .. }, OpKind::Delete { length }) => {
            if op.position <= against.position {
                op.clone()
            } else {
                let mut shifted = op.clone();
                shifted.position = op.position.saturating_sub(*length).max(against.position);
                shifted
            }
        }

        (OpKind::Delete { .. }, OpKind::Insert { content }) => {
            if op.position < against.position {
                op.clone()
            } else {
                let mut shifted = op.clone();
                shifted.position += content.chars().count();
                shifted
            }
        }

        (OpKind::Delete { length }, OpKind::Delete { length: against_length }) => {
            let against_end = against.position + against_length;
            if op.position < against.position {
                op.clone()
            } else if op.position > against_end {
                let mut shifted = op.clone();
                shifted.position -= against_length;
                shifted
            } else {
                let overlap = (*length).min(against_end - op.position);
                let mut shrunk = op.clone();
                shrunk.position = against.position;
                shrunk.kind = OpKind::Delete {
                    length: length - overlap,
                };
                shrunk
            }
        }

        // Retain never moves and never moves anything else
        (OpKind::Retain, _) | (_, OpKind::Retain) => op.clone(),
    }
}
