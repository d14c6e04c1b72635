// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed TTL caches and their lifecycle.
//!
//! Each cache class gets its own [`TtlCache`] with a strongly typed key, so
//! entries of different classes can never collide. Entries older than their
//! class TTL are treated as absent on read and removed by [`CacheManager::sweep`].

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use recollect_config::model::CacheConfig;
use recollect_core::{MemoryId, MemoryRecord, UserId};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::hashing::ContentFingerprint;
use crate::recording;
use crate::types::SimilarityResult;

/// Key for caches partitioned by user and normalized content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserContentKey {
    pub user: UserId,
    pub fingerprint: ContentFingerprint,
}

impl UserContentKey {
    pub fn new(user: &UserId, fingerprint: ContentFingerprint) -> Self {
        Self {
            user: user.clone(),
            fingerprint,
        }
    }
}

/// Key for the pairwise similarity cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimilarityKey {
    pub fingerprint: ContentFingerprint,
    pub candidate: MemoryId,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// A concurrent map whose entries expire after a fixed TTL.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or replace an entry, stamping it with the current time.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return a live entry. An expired entry is removed and reported as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.inserted_at.elapsed() > self.ttl);
        }
        None
    }

    /// Whether `key` holds an entry younger than `ttl_override` (or the cache TTL).
    pub fn is_valid(&self, key: &K, ttl_override: Option<Duration>) -> bool {
        let ttl = ttl_override.unwrap_or(self.ttl);
        self.entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() <= ttl)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let live = entry.inserted_at.elapsed() <= self.ttl;
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    /// Remove every entry whose key matches `pred`. Returns the number removed.
    pub fn invalidate_if(&self, pred: impl Fn(&K) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let hit = pred(key);
            if hit {
                removed += 1;
            }
            !hit
        });
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Entry counts per cache class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hashes: usize,
    pub embeddings: usize,
    pub seen: usize,
    pub prompts: usize,
    pub retrievals: usize,
    pub similarity: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.hashes + self.embeddings + self.seen + self.prompts + self.retrievals + self.similarity
    }
}

/// Owner of every cache class and its TTL.
///
/// - hash class (longest TTL): semantic hashes, embedding vectors, and the
///   seen-content map used for the cheap duplicate short-circuit
/// - general class: prompt strings and contextual-retrieval results
/// - similarity class: pairwise similarity results
#[derive(Debug)]
pub struct CacheManager {
    pub hashes: TtlCache<UserContentKey, String>,
    pub embeddings: TtlCache<UserContentKey, Arc<Vec<f32>>>,
    /// Content recently stored for a user, mapped to the record it landed in.
    pub seen: TtlCache<UserContentKey, MemoryId>,
    pub prompts: TtlCache<UserContentKey, String>,
    pub retrievals: TtlCache<UserContentKey, Vec<MemoryRecord>>,
    pub similarity: TtlCache<SimilarityKey, SimilarityResult>,
}

impl CacheManager {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_ttls(
            Duration::from_secs(config.general_ttl_secs),
            Duration::from_secs(config.similarity_ttl_secs),
            Duration::from_secs(config.hash_ttl_secs),
        )
    }

    pub fn with_ttls(general: Duration, similarity: Duration, hash: Duration) -> Self {
        Self {
            hashes: TtlCache::new(hash),
            embeddings: TtlCache::new(hash),
            seen: TtlCache::new(hash),
            prompts: TtlCache::new(general),
            retrievals: TtlCache::new(general),
            similarity: TtlCache::new(similarity),
        }
    }

    /// Remove expired entries from every cache. Returns the total removed.
    pub fn sweep(&self) -> usize {
        let evicted = self.hashes.sweep()
            + self.embeddings.sweep()
            + self.seen.sweep()
            + self.prompts.sweep()
            + self.retrievals.sweep()
            + self.similarity.sweep();
        if evicted > 0 {
            debug!(evicted, "cache sweep removed expired entries");
        }
        recording::record_evictions(evicted);
        evicted
    }

    pub fn clear_all(&self) {
        self.hashes.clear();
        self.embeddings.clear();
        self.seen.clear();
        self.prompts.clear();
        self.retrievals.clear();
        self.similarity.clear();
    }

    /// Drop the user's prompt and retrieval entries after their memories changed.
    pub fn invalidate_user(&self, user: &UserId) -> usize {
        self.prompts.invalidate_if(|key| key.user == *user)
            + self.retrievals.invalidate_if(|key| key.user == *user)
    }

    /// Drop similarity results computed against a record whose content changed.
    pub fn invalidate_candidate(&self, id: &MemoryId) -> usize {
        self.similarity.invalidate_if(|key| key.candidate == *id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hashes: self.hashes.len(),
            embeddings: self.embeddings.len(),
            seen: self.seen.len(),
            prompts: self.prompts.len(),
            retrievals: self.retrievals.len(),
            similarity: self.similarity.len(),
        }
    }

    /// Sweep every `interval` until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let caches = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        caches.sweep();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(user: &str, text: &str) -> UserContentKey {
        UserContentKey::new(&UserId::new(user), ContentFingerprint::of(text))
    }

    fn manager() -> CacheManager {
        CacheManager::with_ttls(
            Duration::from_secs(300),
            Duration::from_secs(600),
            Duration::from_secs(1800),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_absent_after_ttl() {
        let cache: TtlCache<UserContentKey, String> = TtlCache::new(Duration::from_secs(10));
        let k = key("u1", "hello");
        cache.insert(k.clone(), "h".into());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(&k).as_deref(), Some("h"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get(&k), None);
        // The expired entry was dropped on read.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn is_valid_honours_override() {
        let cache: TtlCache<UserContentKey, u8> = TtlCache::new(Duration::from_secs(60));
        let k = key("u1", "x");
        cache.insert(k.clone(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(cache.is_valid(&k, None));
        assert!(!cache.is_valid(&k, Some(Duration::from_secs(10))));
        assert!(!cache.is_valid(&key("u1", "missing"), None));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let caches = manager();
        caches.prompts.insert(key("u1", "a"), "prompt".into());
        caches.hashes.insert(key("u1", "a"), "hash".into());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(caches.sweep(), 1);
        let stats = caches.stats();
        assert_eq!(stats.prompts, 0);
        assert_eq!(stats.hashes, 1);

        tokio::time::advance(Duration::from_secs(1500)).await;
        assert_eq!(caches.sweep(), 1);
        assert_eq!(caches.stats().total(), 0);
    }

    #[test]
    fn keys_of_different_users_do_not_collide() {
        let cache: TtlCache<UserContentKey, String> = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("alice", "same text"), "a".into());
        cache.insert(key("bob", "same text"), "b".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("alice", "same text")).as_deref(), Some("a"));
    }

    #[test]
    fn invalidate_user_leaves_other_users_and_classes() {
        let caches = manager();
        caches.prompts.insert(key("alice", "q"), "p".into());
        caches.retrievals.insert(key("alice", "q"), vec![]);
        caches.prompts.insert(key("bob", "q"), "p".into());
        caches.hashes.insert(key("alice", "q"), "h".into());

        assert_eq!(caches.invalidate_user(&UserId::new("alice")), 2);
        let stats = caches.stats();
        assert_eq!(stats.prompts, 1);
        assert_eq!(stats.retrievals, 0);
        assert_eq!(stats.hashes, 1);
    }

    #[test]
    fn invalidate_candidate_drops_matching_pairs() {
        let caches = manager();
        let result = |id: &str| SimilarityResult {
            candidate_id: MemoryId(id.into()),
            score: 0.5,
            breakdown: Default::default(),
        };
        for (text, id) in [("a", "m1"), ("b", "m1"), ("a", "m2")] {
            caches.similarity.insert(
                SimilarityKey {
                    fingerprint: ContentFingerprint::of(text),
                    candidate: MemoryId(id.into()),
                },
                result(id),
            );
        }
        assert_eq!(caches.invalidate_candidate(&MemoryId("m1".into())), 2);
        assert_eq!(caches.similarity.len(), 1);
    }

    #[test]
    fn clear_all_empties_everything() {
        let caches = manager();
        caches.hashes.insert(key("u", "a"), "h".into());
        caches.seen.insert(key("u", "a"), MemoryId("m".into()));
        caches.embeddings.insert(key("u", "a"), Arc::new(vec![0.1]));
        caches.clear_all();
        assert_eq!(caches.stats(), CacheStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_until_cancelled() {
        let caches = Arc::new(manager());
        caches.prompts.insert(key("u", "a"), "p".into());
        let cancel = CancellationToken::new();
        let handle = caches.spawn_sweeper(Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(361)).await;
        assert_eq!(caches.prompts.len(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
