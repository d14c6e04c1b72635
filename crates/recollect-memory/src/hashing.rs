// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content normalization, fingerprints, and the cached semantic hasher.
//!
//! The semantic hash is a SHA-256 digest over a fixed-size prefix of the
//! embedding vector. When no embedding is available the digest of the
//! normalized text is used instead, so hashing itself never fails.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use recollect_core::{EmbeddingAdapter, EmbeddingInput, RecollectError, UserId};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{CacheManager, UserContentKey};
use crate::recording;
use crate::types::{FallbackReason, HashOutcome, HashSource};

/// Lowercase, trim, and collapse internal whitespace runs to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 hex digest of normalized text; the key of every content-keyed cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Fingerprint already-normalized text.
    pub fn of(normalized: &str) -> Self {
        ContentFingerprint(hex::encode(Sha256::digest(normalized.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic hash used when no embedding is available.
pub fn content_digest(normalized: &str) -> String {
    ContentFingerprint::of(normalized).0
}

/// Hash the first `prefix_dims` components of an embedding.
///
/// Returns `None` for an empty vector.
pub fn embedding_digest(vector: &[f32], prefix_dims: usize) -> Option<String> {
    if vector.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    for value in vector.iter().take(prefix_dims) {
        hasher.update(value.to_le_bytes());
    }
    Some(hex::encode(hasher.finalize()))
}

/// Computes semantic hashes with a hash cache and an embedding cache in front
/// of the embedding provider.
pub struct SemanticHasher {
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    caches: Arc<CacheManager>,
    prefix_dims: usize,
    timeout: Duration,
}

impl SemanticHasher {
    /// `embedder = None` hashes content only.
    pub fn new(
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
        caches: Arc<CacheManager>,
        prefix_dims: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            caches,
            prefix_dims,
            timeout,
        }
    }

    /// Return the semantic hash of `message` for `user`.
    ///
    /// Never fails: provider errors, timeouts and empty vectors fall back to
    /// the content digest, reported through [`HashSource::Fallback`].
    pub async fn get_or_compute_hash(&self, user: &UserId, message: &str) -> HashOutcome {
        let normalized = normalize(message);
        let key = UserContentKey::new(user, ContentFingerprint::of(&normalized));

        if let Some(hash) = self.caches.hashes.get(&key) {
            recording::record_hash_source(&HashSource::Cached);
            return HashOutcome {
                hash,
                source: HashSource::Cached,
            };
        }

        let (hash, source) = self.compute(&key, &normalized).await;
        self.caches.hashes.insert(key, hash.clone());
        recording::record_hash_source(&source);
        HashOutcome { hash, source }
    }

    async fn compute(&self, key: &UserContentKey, normalized: &str) -> (String, HashSource) {
        let Some(embedder) = &self.embedder else {
            return (content_digest(normalized), HashSource::ContentOnly);
        };

        let reason = match self.embedding_for(embedder.as_ref(), key, normalized).await {
            Ok(vector) => match embedding_digest(&vector, self.prefix_dims) {
                Some(hash) => return (hash, HashSource::Embedding),
                None => FallbackReason::EmptyEmbedding,
            },
            Err(reason) => reason,
        };

        warn!(
            user = %key.user,
            reason = %reason,
            "embedding unavailable, using content digest as semantic hash"
        );
        recording::record_fallback("hasher");
        (content_digest(normalized), HashSource::Fallback(reason))
    }

    async fn embedding_for(
        &self,
        embedder: &dyn EmbeddingAdapter,
        key: &UserContentKey,
        normalized: &str,
    ) -> Result<Arc<Vec<f32>>, FallbackReason> {
        if let Some(vector) = self.caches.embeddings.get(key) {
            debug!(user = %key.user, "embedding cache hit");
            return Ok(vector);
        }

        let input = EmbeddingInput {
            texts: vec![normalized.to_string()],
        };
        let output = tokio::time::timeout(self.timeout, embedder.embed(input))
            .await
            .unwrap_or(Err(RecollectError::Timeout {
                duration: self.timeout,
            }))?;

        let vector = output
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(FallbackReason::EmptyEmbedding)?;
        let vector = Arc::new(vector);
        self.caches.embeddings.insert(key.clone(), Arc::clone(&vector));
        Ok(vector)
    }
}
