//! Integration tests for the collaboration system
//! Tests convergence, concurrent editing, and offline reconciliation
//!
//! These tests drive complete editing sessions over a shared in-memory
//! transport: multiple editors exchanging operations and presence signals,
//! checking that all replicas converge to the same final state.

use std::sync::Arc;
use std::time::Duration;

use collab::{
    ChannelEvent, ChannelId, CollaborativeEditor, CollaboratorProfile, ConflictResolver,
    DocumentId, DocumentSnapshot, MemoryTransport, Transport, TypingIndicator, WireEnvelope,
};
use ot_engine::{CollaboratorId, Operation};
use proptest::prelude::*;

fn make_editor(
    transport: &Arc<MemoryTransport>,
    document: &str,
    collaborator: &str,
    content: &str,
) -> CollaborativeEditor {
    CollaborativeEditor::with_content(
        DocumentId::new(document),
        CollaboratorId::new(collaborator),
        transport.clone(),
        content,
    )
    .unwrap()
}

/// Two collaborators on the same document, both seeded with `content`.
fn make_pair(content: &str) -> (Arc<MemoryTransport>, CollaborativeEditor, CollaborativeEditor) {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MemoryTransport::shared();
    let alice = make_editor(&transport, "doc-1", "alice", content);
    let bob = make_editor(&transport, "doc-1", "bob", content);
    (transport, alice, bob)
}

fn doc_channel(id: &str) -> ChannelId {
    ChannelId::document(&DocumentId::new(id))
}

// ========== Convergence Scenarios ==========

#[test]
fn test_single_edit_reaches_every_replica() {
    let (_transport, mut alice, mut bob) = make_pair("Hello world");

    alice.insert(5, " there");
    bob.process_incoming();

    assert_eq!(alice.content(), "Hello there world");
    assert_eq!(bob.content(), "Hello there world");
    assert_eq!(alice.version(), 1);
    assert_eq!(bob.version(), 1);

    // Alice's own echo changes nothing.
    assert_eq!(alice.process_incoming(), 0);
    assert_eq!(alice.content(), "Hello there world");
}

#[test]
fn test_crossed_deletes_converge() {
    let (_transport, mut alice, mut bob) = make_pair("abc");

    // Both delete concurrently, then each folds in the other's operation.
    alice.delete(0, 1);
    bob.delete(1, 1);
    alice.process_incoming();
    bob.process_incoming();

    assert_eq!(alice.content(), "c");
    assert_eq!(bob.content(), "c");
    assert_eq!(alice.version(), bob.version());
}

#[test]
fn test_concurrent_inserts_at_same_position_converge() {
    let (_transport, mut alice, mut bob) = make_pair("");

    alice.insert(0, "X");
    bob.insert(0, "Y");
    alice.process_incoming();
    bob.process_incoming();

    // The lexicographically larger origin shifts right of the smaller one.
    assert_eq!(alice.content(), "XY");
    assert_eq!(bob.content(), "XY");
}

#[test]
fn test_multi_operation_burst_converges() {
    let (_transport, mut alice, mut bob) = make_pair("abcdef");

    // Alice types twice while Bob deletes from the middle.
    alice.insert(0, "X");
    alice.insert(1, "Y");
    bob.delete(2, 2);
    alice.process_incoming();
    bob.process_incoming();

    assert_eq!(alice.content(), "XYabef");
    assert_eq!(bob.content(), "XYabef");
    assert_eq!(alice.version(), 2);
    assert_eq!(bob.version(), 2);
}

#[test]
fn test_replace_converges_through_both_halves() {
    let (_transport, mut alice, mut bob) = make_pair("Hello world");

    alice.replace(0, 5, "Howdy");
    bob.process_incoming();

    assert_eq!(alice.content(), "Howdy world");
    assert_eq!(bob.content(), "Howdy world");
    assert_eq!(bob.version(), 2);
}

#[test]
fn test_replace_publishes_exactly_two_envelopes() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MemoryTransport::shared();
    let mut watcher = transport.subscribe(&doc_channel("doc-1")).unwrap();
    let mut alice = make_editor(&transport, "doc-1", "alice", "Hello world");

    alice.replace(0, 5, "Howdy");

    let first = WireEnvelope::decode(&watcher.try_recv().unwrap()).unwrap();
    let second = WireEnvelope::decode(&watcher.try_recv().unwrap()).unwrap();
    assert!(watcher.try_recv().is_none());
    match (first.event, second.event) {
        (ChannelEvent::Operation(deleted), ChannelEvent::Operation(inserted)) => {
            assert_eq!(deleted.kind_name(), "delete");
            assert_eq!(inserted.kind_name(), "insert");
        }
        other => panic!("expected two operations, got {:?}", other),
    }
}

// ========== Pending Queue Management ==========

#[test]
fn test_settled_queue_clears_and_editing_continues() {
    let (_transport, mut alice, mut bob) = make_pair("");

    alice.insert(0, "one");
    bob.process_incoming();
    assert_eq!(alice.pending_count(), 1);

    // Caller-side settlement: the burst is acknowledged, drop it.
    alice.clear_pending();
    bob.clear_pending();
    assert_eq!(alice.pending_count(), 0);

    bob.insert(3, " two");
    alice.process_incoming();

    assert_eq!(alice.content(), "one two");
    assert_eq!(bob.content(), "one two");
}

// ========== Resilience ==========

#[test]
fn test_broken_payloads_do_not_poison_the_channel() {
    let (transport, mut alice, mut bob) = make_pair("");

    transport
        .publish(&doc_channel("doc-1"), b"{not json".to_vec())
        .unwrap();

    // A payload from a newer wire version is dropped, not misread.
    let future = WireEnvelope::new(ChannelEvent::Operation(Operation::insert(
        0,
        "x",
        CollaboratorId::new("mallory"),
        1,
    )));
    let mut value = serde_json::to_value(&future).unwrap();
    value["v"] = serde_json::json!(9);
    transport
        .publish(&doc_channel("doc-1"), serde_json::to_vec(&value).unwrap())
        .unwrap();

    alice.insert(0, "ok");

    assert_eq!(bob.process_incoming(), 1);
    assert_eq!(bob.content(), "ok");
    assert_eq!(alice.content(), "ok");
}

// ========== Typing Presence ==========

#[tokio::test(start_paused = true)]
async fn test_typing_presence_reaches_peers_and_times_out() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MemoryTransport::shared();
    let document = DocumentId::new("doc-1");
    let mut bob = make_editor(&transport, "doc-1", "bob", "");
    let mut watcher = transport
        .subscribe(&ChannelId::document(&document))
        .unwrap();

    let mut indicator = TypingIndicator::new(
        CollaboratorProfile::new(CollaboratorId::new("alice"), "Alice"),
        transport.clone(),
        &document,
    );

    indicator.start_typing();
    assert!(indicator.is_typing());

    // Presence never touches document state.
    assert_eq!(bob.process_incoming(), 0);
    assert_eq!(bob.content(), "");

    match watcher
        .try_recv()
        .map(|b| WireEnvelope::decode(&b).unwrap().event)
    {
        Some(ChannelEvent::TypingStart(profile)) => assert_eq!(profile.name, "Alice"),
        other => panic!("expected typing:start, got {:?}", other),
    }

    // The default idle timeout fires a stop without further keystrokes.
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert!(!indicator.is_typing());
    match watcher
        .try_recv()
        .map(|b| WireEnvelope::decode(&b).unwrap().event)
    {
        Some(ChannelEvent::TypingStop { collaborator }) => {
            assert_eq!(collaborator.as_str(), "alice");
        }
        other => panic!("expected typing:stop, got {:?}", other),
    }
}

// ========== Lifecycle and Channel Scoping ==========

#[test]
fn test_destroyed_editor_is_pruned_from_the_hub() {
    let (transport, alice, mut bob) = make_pair("x");
    assert_eq!(transport.subscriber_count(&doc_channel("doc-1")), 2);

    bob.destroy();
    assert_eq!(transport.subscriber_count(&doc_channel("doc-1")), 1);

    drop(alice);
    assert_eq!(transport.subscriber_count(&doc_channel("doc-1")), 0);
}

#[test]
fn test_documents_have_isolated_channels() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MemoryTransport::shared();
    let mut alice = make_editor(&transport, "doc-a", "alice", "");
    let mut carol = make_editor(&transport, "doc-b", "carol", "");

    alice.insert(0, "only for doc-a");

    assert_eq!(carol.process_incoming(), 0);
    assert_eq!(carol.content(), "");
}

#[test]
fn test_rejoin_after_destroy_starts_clean_session() {
    let (transport, mut alice, mut bob) = make_pair("shared");

    alice.insert(6, " text");
    bob.process_incoming();
    alice.destroy();

    // Alice rejoins from the converged content with an empty queue.
    let mut alice = make_editor(&transport, "doc-1", "alice", bob.content());
    assert_eq!(alice.pending_count(), 0);

    bob.insert(0, ">> ");
    alice.process_incoming();

    assert_eq!(alice.content(), ">> shared text");
    assert_eq!(bob.content(), ">> shared text");
}

// ========== Randomized Convergence ==========

proptest! {
    /// Crossed single-insert exchanges converge through the full wire
    /// path: encode, fan out, decode, transform against pending.
    #[test]
    fn concurrent_insert_pairs_converge_over_the_wire(
        pos_a in 0usize..=19,
        pos_b in 0usize..=19,
        text_a in "[ -~]{1,8}",
        text_b in "[ -~]{1,8}",
    ) {
        let (_transport, mut alice, mut bob) = make_pair("the quick brown fox");

        alice.insert(pos_a, text_a.clone());
        bob.insert(pos_b, text_b.clone());
        alice.process_incoming();
        bob.process_incoming();

        prop_assert_eq!(alice.content(), bob.content());
        prop_assert_eq!(alice.version(), bob.version());
        prop_assert_eq!(
            alice.content().chars().count(),
            19 + text_a.chars().count() + text_b.chars().count()
        );
    }
}

// ========== Offline Reconciliation ==========

#[test]
fn test_offline_divergence_reconciles_with_snapshots() {
    let (_transport, mut alice, mut bob) = make_pair("draft");

    // Both go offline and edit independently.
    alice.destroy();
    bob.destroy();
    alice.insert(5, " by alice");
    bob.insert(5, " by bob");
    bob.insert(12, "!");

    let local = DocumentSnapshot::new(alice.content(), alice.version(), 1_000);
    let remote = DocumentSnapshot::new(bob.content(), bob.version(), 2_000);

    // Version-based pick: Bob edited twice and wins.
    let winner = ConflictResolver::version_based(local.clone(), remote.clone());
    assert_eq!(winner.content, "draft by bob!");

    // Or surface the divergence for a human instead of guessing.
    let merged = ConflictResolver::merge(&local.content, &remote.content, "draft");
    assert!(ConflictResolver::has_conflict_markers(&merged));
    assert!(merged.contains("draft by alice"));
    assert!(merged.contains("draft by bob!"));
}
