// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline tests over the SQLite store, the keyword detector and the mock
//! embedder.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recollect_config::RecollectConfig;
use recollect_core::{MemoryStoreAdapter, UserId};
use recollect_memory::{
    AppliedAction, DedupAction, KeywordDetector, MemoryPipeline, SqliteMemoryStore,
};
use recollect_test_utils::{InMemoryStore, MockEmbedder};

struct Harness {
    pipeline: MemoryPipeline,
    store: Arc<SqliteMemoryStore>,
    embedder: Arc<MockEmbedder>,
}

async fn harness() -> Harness {
    let config = RecollectConfig::default();
    let store = Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());
    let embedder = Arc::new(MockEmbedder::new(768));
    let detector = Arc::new(KeywordDetector::from_config(&config.detector).unwrap());
    let pipeline = MemoryPipeline::new(
        &config,
        Arc::clone(&store) as Arc<dyn MemoryStoreAdapter>,
        Some(Arc::clone(&embedder) as _),
        detector,
    );
    Harness {
        pipeline,
        store,
        embedder,
    }
}

#[tokio::test]
async fn hiking_conversation_ends_with_two_memories() {
    let h = harness().await;
    let user = UserId::new("alice");
    let start = Utc::now();

    let first = h
        .pipeline
        .handle_message(&user, "I like hiking on weekends", start)
        .await;
    let first = first.outcome.expect("memory-worthy");
    assert_eq!(first.decision.action, DedupAction::Create);
    assert_eq!(first.decision.confidence, 1.0);
    let AppliedAction::Created(record) = &first.applied else {
        panic!("expected a created record, got {:?}", first.applied);
    };
    let hiking_id = record.id.clone();

    let second = h
        .pipeline
        .handle_message(
            &user,
            "I really like hiking on weekends",
            start + chrono::Duration::seconds(30),
        )
        .await
        .outcome
        .expect("memory-worthy");
    assert_eq!(second.decision.action, DedupAction::Merge, "{second:?}");
    assert_eq!(second.decision.target, Some(hiking_id.clone()));
    let score = second.decision.best_match.as_ref().unwrap().score;
    assert!((0.7..=0.85).contains(&score), "score {score}");
    assert_eq!(second.applied, AppliedAction::Merged(hiking_id.clone()));

    let third = h
        .pipeline
        .handle_message(
            &user,
            "my favorite color is blue",
            start + chrono::Duration::seconds(60),
        )
        .await
        .outcome
        .expect("memory-worthy");
    assert_eq!(third.decision.action, DedupAction::Create, "{third:?}");

    assert_eq!(h.store.count_active(&user).await.unwrap(), 2);
    let merged = h.store.get_by_id(&hiking_id).await.unwrap().unwrap();
    assert_eq!(
        merged.content,
        "I like hiking on weekends; I really like hiking on weekends"
    );
}

#[tokio::test]
async fn chit_chat_is_not_stored() {
    let h = harness().await;
    let user = UserId::new("alice");

    let report = h
        .pipeline
        .handle_message(&user, "what's the weather tomorrow?", Utc::now())
        .await;

    assert!(!report.detection.should_remember);
    assert!(report.outcome.is_none());
    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.store.count_active(&user).await.unwrap(), 0);
}

#[tokio::test]
async fn repeated_message_is_skipped_with_full_confidence() {
    let h = harness().await;
    let user = UserId::new("alice");
    let start = Utc::now();

    h.pipeline
        .handle_message(&user, "I love green tea", start)
        .await;
    let again = h
        .pipeline
        .handle_message(
            &user,
            "i love   GREEN tea",
            start + chrono::Duration::minutes(5),
        )
        .await
        .outcome
        .expect("memory-worthy");

    assert_eq!(again.decision.action, DedupAction::Skip);
    assert_eq!(again.decision.confidence, 1.0);
    assert_eq!(again.applied, AppliedAction::Skipped);
    assert_eq!(h.embedder.calls(), 1);
    assert_eq!(h.store.count_active(&user).await.unwrap(), 1);
}

#[tokio::test]
async fn remember_prefix_is_stripped_before_storing() {
    let h = harness().await;
    let user = UserId::new("alice");

    let report = h
        .pipeline
        .handle_message(&user, "please remember that my dog is called Rex", Utc::now())
        .await;

    let outcome = report.outcome.expect("memory-worthy");
    let AppliedAction::Created(record) = outcome.applied else {
        panic!("expected a created record");
    };
    assert_eq!(record.content, "my dog is called Rex");
}

#[tokio::test]
async fn embedding_outage_still_stores_memory() {
    let h = harness().await;
    h.embedder.set_failing(true);
    let user = UserId::new("alice");

    let outcome = h
        .pipeline
        .handle_message(&user, "I work as a carpenter", Utc::now())
        .await
        .outcome
        .expect("memory-worthy");

    assert_eq!(outcome.decision.action, DedupAction::Create);
    assert!(outcome.decision.degraded.is_some());
    assert!(!outcome.decision.semantic_hash.is_empty());
    assert!(matches!(outcome.applied, AppliedAction::Created(_)));
    assert_eq!(h.store.count_active(&user).await.unwrap(), 1);
}

#[tokio::test]
async fn users_do_not_share_memories() {
    let h = harness().await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let now = Utc::now();

    h.pipeline
        .handle_message(&alice, "I like hiking on weekends", now)
        .await;
    let bob_outcome = h
        .pipeline
        .handle_message(&bob, "I like hiking on weekends", now)
        .await
        .outcome
        .expect("memory-worthy");

    assert_eq!(bob_outcome.decision.action, DedupAction::Create);
    assert_eq!(bob_outcome.decision.confidence, 1.0);
    assert_eq!(h.store.count_active(&alice).await.unwrap(), 1);
    assert_eq!(h.store.count_active(&bob).await.unwrap(), 1);
}

#[tokio::test]
async fn context_reflects_new_memories() {
    let h = harness().await;
    let user = UserId::new("alice");

    let before = h.pipeline.context_for(&user, "any hiking plans?").await;
    h.pipeline
        .handle_message(&user, "I like hiking on weekends", Utc::now())
        .await;
    let after = h.pipeline.context_for(&user, "any hiking plans?").await;

    assert!(!before.contains("hiking on weekends"));
    assert!(after.contains("I like hiking on weekends."), "{after}");
}

#[tokio::test(start_paused = true)]
async fn simultaneous_identical_messages_mutate_once() {
    let config = RecollectConfig::default();
    let store = Arc::new(InMemoryStore::new());
    store.set_delay(Duration::from_millis(100));
    let detector = Arc::new(KeywordDetector::from_config(&config.detector).unwrap());
    let pipeline = MemoryPipeline::new(
        &config,
        Arc::clone(&store) as Arc<dyn MemoryStoreAdapter>,
        Some(Arc::new(MockEmbedder::new(64)) as _),
        detector,
    );
    let user = UserId::new("alice");
    let at = Utc::now();

    let (a, b) = tokio::join!(
        pipeline.handle_message(&user, "I own a red bicycle", at),
        pipeline.handle_message(&user, "I own a red bicycle", at),
    );

    assert_eq!(a.outcome, b.outcome);
    assert_eq!(store.mutations(), 1);
    assert_eq!(store.active_for("alice").len(), 1);
}

#[tokio::test]
async fn failing_store_degrades_to_create_without_panicking() {
    let config = RecollectConfig::default();
    let store = Arc::new(InMemoryStore::new());
    store.set_failing(true);
    let detector = Arc::new(KeywordDetector::from_config(&config.detector).unwrap());
    let pipeline = MemoryPipeline::new(
        &config,
        Arc::clone(&store) as Arc<dyn MemoryStoreAdapter>,
        None,
        detector,
    );

    let outcome = pipeline
        .handle_message(&UserId::new("alice"), "I live in Lisbon now", Utc::now())
        .await
        .outcome
        .expect("memory-worthy");

    assert_eq!(outcome.decision.action, DedupAction::Create);
    assert!(outcome.decision.degraded.is_some());
    assert!(matches!(outcome.applied, AppliedAction::Failed(_)));
}
