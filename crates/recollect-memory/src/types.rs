// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision, similarity and hashing types for the deduplication subsystem.

use std::time::Duration;

use recollect_core::{MemoryId, MemoryRecord, RecollectError};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What to do with an incoming memory-worthy message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DedupAction {
    /// Store as a new record.
    Create,
    /// Replace the content of the best-matching record.
    Update,
    /// Fold the new content into the best-matching record.
    Merge,
    /// Discard as a duplicate.
    Skip,
}

/// Per-metric similarity scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricBreakdown {
    pub jaccard: f64,
    pub overlap: f64,
    pub edit: f64,
    pub ngram: f64,
}

/// Similarity between a new message and one candidate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub candidate_id: MemoryId,
    /// Weighted combination of the breakdown, in [0, 1].
    pub score: f64,
    pub breakdown: MetricBreakdown,
}

/// Result of the decision procedure for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupDecision {
    pub action: DedupAction,
    pub confidence: f64,
    pub reasoning: String,
    /// Record the action applies to, for `update`, `merge` and hash-matched `skip`.
    pub target: Option<MemoryId>,
    /// Semantic hash of the incoming content, stored on `create`.
    pub semantic_hash: String,
    pub best_match: Option<SimilarityResult>,
    /// Set when the decision was reached on a degraded path.
    pub degraded: Option<String>,
}

/// Outcome of executing a decision against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AppliedAction {
    Created(MemoryRecord),
    Updated(MemoryId),
    Merged(MemoryId),
    Skipped,
    /// The store rejected the mutation; the decision itself still stands.
    Failed(String),
}

impl AppliedAction {
    /// Whether this outcome changed the store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            AppliedAction::Created(_) | AppliedAction::Updated(_) | AppliedAction::Merged(_)
        )
    }
}

/// A decision together with what was done about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupOutcome {
    pub decision: DedupDecision,
    pub applied: AppliedAction,
}

/// Why the hasher fell back to a content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    Provider(String),
    Timeout(Duration),
    EmptyEmbedding,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Provider(msg) => write!(f, "embedding provider failed: {msg}"),
            FallbackReason::Timeout(d) => write!(f, "embedding provider timed out after {d:?}"),
            FallbackReason::EmptyEmbedding => f.write_str("embedding provider returned no vector"),
        }
    }
}

impl From<RecollectError> for FallbackReason {
    fn from(err: RecollectError) -> Self {
        match err {
            RecollectError::Timeout { duration } => FallbackReason::Timeout(duration),
            other => FallbackReason::Provider(other.to_string()),
        }
    }
}

/// Where a semantic hash came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashSource {
    /// Served from the hash cache.
    Cached,
    /// Derived from an embedding prefix.
    Embedding,
    /// No embedding provider configured; content digest by design.
    ContentOnly,
    /// The provider failed and the content digest was used instead.
    Fallback(FallbackReason),
}

impl HashSource {
    pub fn label(&self) -> &'static str {
        match self {
            HashSource::Cached => "cached",
            HashSource::Embedding => "embedding",
            HashSource::ContentOnly => "content",
            HashSource::Fallback(_) => "fallback",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, HashSource::Fallback(_))
    }
}

/// A semantic hash and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutcome {
    pub hash: String,
    pub source: HashSource,
}
