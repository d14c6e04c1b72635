// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The deduplication decision procedure and its execution against the store.
//!
//! Per message:
//! 1. exact semantic hash match in the store -> skip (1.0)
//! 2. content fingerprint seen recently -> skip (0.9)
//! 3. no recent memories -> create (1.0)
//! 4. fuzzy best match over the recent window -> merge / update / create
//!
//! Any error in steps 1-4 yields a degraded create (0.8). Concurrent calls
//! for the same (user, content, timestamp bucket) share one in-flight run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use recollect_config::model::{DedupConfig, EmbeddingConfig};
use recollect_core::{
    EmbeddingAdapter, MemoryId, MemoryStoreAdapter, RecollectError, UserId,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, UserContentKey};
use crate::decision::{self, DecisionThresholds};
use crate::hashing::{normalize, ContentFingerprint, SemanticHasher};
use crate::recording;
use crate::similarity::{SimilarityEngine, SimilarityWeights};
use crate::types::{AppliedAction, DedupAction, DedupDecision, DedupOutcome, HashSource};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InFlightKey {
    user: UserId,
    fingerprint: ContentFingerprint,
    bucket: i64,
}

type InFlight = Shared<BoxFuture<'static, DedupOutcome>>;

/// Tunables of the deduplicator, usually built from configuration.
#[derive(Debug, Clone)]
pub struct DedupSettings {
    pub thresholds: DecisionThresholds,
    pub weights: SimilarityWeights,
    pub similarity_floor: f64,
    pub recent_window_hours: u32,
    pub timestamp_bucket_secs: u64,
    pub hash_prefix_dims: usize,
    pub embedding_timeout: Duration,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default(), &EmbeddingConfig::default())
    }
}

impl DedupSettings {
    pub fn from_config(dedup: &DedupConfig, embedding: &EmbeddingConfig) -> Self {
        Self {
            thresholds: DecisionThresholds::from(dedup),
            weights: SimilarityWeights::from(&dedup.weights),
            similarity_floor: dedup.similarity_floor,
            recent_window_hours: dedup.recent_window_hours,
            timestamp_bucket_secs: dedup.timestamp_bucket_secs.max(1),
            hash_prefix_dims: embedding.hash_prefix_dims,
            embedding_timeout: Duration::from_millis(embedding.timeout_ms),
        }
    }
}

struct Inner {
    store: Arc<dyn MemoryStoreAdapter>,
    hasher: SemanticHasher,
    engine: SimilarityEngine,
    caches: Arc<CacheManager>,
    settings: DedupSettings,
}

/// Decides and applies create / update / merge / skip for memory-worthy content.
pub struct MemoryDeduplicator {
    inner: Arc<Inner>,
    in_flight: Arc<DashMap<InFlightKey, InFlight>>,
}

impl MemoryDeduplicator {
    pub fn new(
        store: Arc<dyn MemoryStoreAdapter>,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
        caches: Arc<CacheManager>,
        settings: DedupSettings,
    ) -> Self {
        let hasher = SemanticHasher::new(
            embedder,
            Arc::clone(&caches),
            settings.hash_prefix_dims,
            settings.embedding_timeout,
        );
        let engine = SimilarityEngine::new(
            settings.weights,
            settings.similarity_floor,
            Arc::clone(&caches),
        );
        Self {
            inner: Arc::new(Inner {
                store,
                hasher,
                engine,
                caches,
                settings,
            }),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn caches(&self) -> &Arc<CacheManager> {
        &self.inner.caches
    }

    pub fn hasher(&self) -> &SemanticHasher {
        &self.inner.hasher
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.inner.engine
    }

    /// Decide what to do with `content` without touching the store.
    ///
    /// Never fails; see [`DedupDecision::degraded`].
    pub async fn check_duplicate(&self, user: &UserId, content: &str) -> DedupDecision {
        self.inner.decide(user, content).await
    }

    /// Decide and execute for `content` received at `at`.
    ///
    /// Callers racing on the same user, normalized content and timestamp
    /// bucket await a single shared run, so the store sees one mutation.
    /// The run is driven by a spawned task: it completes and leaves the
    /// in-flight table even when every caller is dropped.
    pub async fn process(&self, user: &UserId, content: &str, at: DateTime<Utc>) -> DedupOutcome {
        let key = InFlightKey {
            user: user.clone(),
            fingerprint: ContentFingerprint::of(&normalize(content)),
            bucket: at
                .timestamp()
                .div_euclid(self.inner.settings.timestamp_bucket_secs as i64),
        };

        let fut = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                recording::record_inflight_join();
                debug!(user = %user, "joining in-flight deduplication");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let inner = Arc::clone(&self.inner);
                let user = user.clone();
                let content = content.to_string();
                let fut = async move { inner.run(&user, &content).await }
                    .boxed()
                    .shared();
                slot.insert(fut.clone());

                let table = Arc::clone(&self.in_flight);
                let driven = fut.clone();
                let task_key = key.clone();
                tokio::spawn(async move {
                    driven.clone().await;
                    table.remove_if(&task_key, |_, running| running.ptr_eq(&driven));
                });
                fut
            }
        };

        let outcome = fut.clone().await;
        self.in_flight
            .remove_if(&key, |_, running| running.ptr_eq(&fut));
        outcome
    }

    /// Number of runs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl Inner {
    async fn run(&self, user: &UserId, content: &str) -> DedupOutcome {
        let decision = self.decide(user, content).await;
        recording::record_decision(decision.action);
        let applied = self.apply(user, content, &decision).await;
        info!(
            user = %user,
            action = %decision.action,
            confidence = decision.confidence,
            degraded = decision.degraded.is_some(),
            "memory deduplicated"
        );
        DedupOutcome { decision, applied }
    }

    async fn decide(&self, user: &UserId, content: &str) -> DedupDecision {
        let hashed = self.hasher.get_or_compute_hash(user, content).await;
        let normalized = normalize(content);
        let fingerprint = ContentFingerprint::of(&normalized);

        match self
            .try_decide(user, &normalized, fingerprint, hashed.hash.clone())
            .await
        {
            Ok(mut decision) => {
                if let HashSource::Fallback(reason) = &hashed.source {
                    decision.degraded = Some(reason.to_string());
                }
                decision
            }
            Err(e) => {
                warn!(user = %user, error = %e, "deduplication failed, defaulting to create");
                recording::record_fallback("decision");
                decision::create_fallback(hashed.hash, &e.to_string())
            }
        }
    }

    async fn try_decide(
        &self,
        user: &UserId,
        normalized: &str,
        fingerprint: ContentFingerprint,
        semantic_hash: String,
    ) -> Result<DedupDecision, RecollectError> {
        if let Some(existing) = self
            .store
            .find_by_semantic_hash(user, &semantic_hash)
            .await?
            .filter(|record| record.is_active)
        {
            return Ok(decision::skip_exact(semantic_hash, existing.id));
        }

        let seen_key = UserContentKey::new(user, fingerprint);
        if let Some(existing) = self.caches.seen.get(&seen_key) {
            return Ok(decision::skip_seen(semantic_hash, existing));
        }

        let recent = self
            .store
            .find_recent(user, self.settings.recent_window_hours)
            .await?;
        if recent.is_empty() {
            return Ok(decision::create_first(semantic_hash));
        }

        let best = self.engine.find_best_match(normalized, &recent);
        Ok(self.settings.thresholds.decide(semantic_hash, best))
    }

    async fn apply(&self, user: &UserId, content: &str, decision: &DedupDecision) -> AppliedAction {
        let content = content.trim();
        let result = match (decision.action, &decision.target) {
            (DedupAction::Skip, _) => return AppliedAction::Skipped,
            (DedupAction::Create, _) => self
                .store
                .create(user, content, &decision.semantic_hash)
                .await
                .map(AppliedAction::Created),
            (DedupAction::Update, Some(id)) => self
                .store
                .update(id, content)
                .await
                .map(|()| AppliedAction::Updated(id.clone())),
            (DedupAction::Merge, Some(id)) => self
                .store
                .merge(id, content)
                .await
                .map(|()| AppliedAction::Merged(id.clone())),
            (action, None) => Err(RecollectError::Internal(format!(
                "{action} decision without a target record"
            ))),
        };

        match result {
            Ok(applied) => {
                self.after_mutation(user, content, &applied);
                applied
            }
            Err(e) => {
                warn!(user = %user, action = %decision.action, error = %e, "memory store mutation failed");
                recording::record_fallback("store");
                AppliedAction::Failed(e.to_string())
            }
        }
    }

    fn after_mutation(&self, user: &UserId, content: &str, applied: &AppliedAction) {
        let target: MemoryId = match applied {
            AppliedAction::Created(record) => record.id.clone(),
            AppliedAction::Updated(id) | AppliedAction::Merged(id) => {
                self.caches.invalidate_candidate(id);
                id.clone()
            }
            AppliedAction::Skipped | AppliedAction::Failed(_) => return,
        };
        let key = UserContentKey::new(user, ContentFingerprint::of(&normalize(content)));
        self.caches.seen.insert(key, target);
        self.caches.invalidate_user(user);
    }
}
