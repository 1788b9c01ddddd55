//! Conflict resolution for divergent document copies.
//!
//! These strategies sit outside the live transform path: while peers are
//! connected, operation transformation keeps replicas converged and nothing
//! here runs. They exist for reconciliation after offline edits, where two
//! whole copies of a document must be reduced to one.
//!
//! # Resolution Rules
//!
//! - **Last write wins**: higher timestamp wins, remote on a tie
//! - **Version based**: higher version wins, remote on a tie
//! - **Three-way merge**: a side unchanged from base yields to the changed
//!   one; two real divergences produce conflict markers for a human

use serde::{Deserialize, Serialize};

/// Opens a conflicted region; the local side follows.
pub const CONFLICT_MARKER_LOCAL: &str = "<<<<<<< LOCAL";
/// Separates the local and remote sides of a conflicted region.
pub const CONFLICT_MARKER_SEPARATOR: &str = "=======";
/// Closes a conflicted region; the remote side precedes it.
pub const CONFLICT_MARKER_REMOTE: &str = ">>>>>>> REMOTE";

/// Anything carrying a wall-clock modification time.
pub trait Stamped {
    fn timestamp_ms(&self) -> u64;
}

/// Anything carrying a document version counter.
pub trait Versioned {
    fn version(&self) -> u64;
}

/// A whole-document copy captured for reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// Full document text.
    pub content: String,
    /// Version counter at capture time.
    pub version: u64,
    /// Wall-clock time of the last edit (Unix timestamp in ms).
    pub updated_at_ms: u64,
}

impl DocumentSnapshot {
    pub fn new(content: impl Into<String>, version: u64, updated_at_ms: u64) -> Self {
        Self {
            content: content.into(),
            version,
            updated_at_ms,
        }
    }
}

impl Stamped for DocumentSnapshot {
    fn timestamp_ms(&self) -> u64 {
        self.updated_at_ms
    }
}

impl Versioned for DocumentSnapshot {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Stamped for ot_engine::Operation {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl Versioned for ot_engine::Operation {
    fn version(&self) -> u64 {
        self.version
    }
}

/// Strategies for reducing two divergent copies to one.
pub struct ConflictResolver;

impl ConflictResolver {
    // ========== Pick Strategies ==========

    /// Resolve by wall-clock time.
    ///
    /// Rule: the higher timestamp wins, remote on a tie. Lossy: the losing
    /// side is discarded entirely. Susceptible to clock skew between
    /// machines; prefer [`ConflictResolver::version_based`] when that
    /// matters.
    pub fn last_write_wins<T: Stamped>(local: T, remote: T) -> T {
        if local.timestamp_ms() > remote.timestamp_ms() {
            local
        } else {
            remote
        }
    }

    /// Resolve by version counter.
    ///
    /// Rule: the higher version wins, remote on a tie. Lossy like
    /// [`ConflictResolver::last_write_wins`], but immune to clock skew.
    pub fn version_based<T: Versioned>(local: T, remote: T) -> T {
        if local.version() > remote.version() {
            local
        } else {
            remote
        }
    }

    // ========== Text Merge ==========

    /// Three-way whole-text merge.
    ///
    /// A side that still equals `base` yields to the other; identical
    /// changes collapse to the common text. Two real divergences return a
    /// conflict-marked block instead of guessing. Never fails.
    pub fn merge(local: &str, remote: &str, base: &str) -> String {
        if local == remote {
            return local.to_string();
        }
        if local == base {
            return remote.to_string();
        }
        if remote == base {
            return local.to_string();
        }
        tracing::debug!(
            "Unmergeable divergence: {} local chars vs {} remote chars",
            local.chars().count(),
            remote.chars().count()
        );
        format!(
            "{}\n{}\n{}\n{}\n{}",
            CONFLICT_MARKER_LOCAL, local, CONFLICT_MARKER_SEPARATOR, remote, CONFLICT_MARKER_REMOTE
        )
    }

    /// Whether `text` contains an unresolved conflict block produced by
    /// [`ConflictResolver::merge`].
    pub fn has_conflict_markers(text: &str) -> bool {
        text.contains(CONFLICT_MARKER_LOCAL) && text.contains(CONFLICT_MARKER_REMOTE)
    }
}
