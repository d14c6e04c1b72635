// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory deduplication and retrieval cache.
//!
//! Decides for every memory-worthy message whether it is new information
//! (create), a refinement of something known (update / merge) or a duplicate
//! (skip), with short-lived caches in front of the expensive embedding and
//! similarity work.
//!
//! - [`hashing`] - normalization and the cached semantic hasher
//! - [`similarity`] - four-metric fuzzy similarity and best-match selection
//! - [`decision`] / [`dedup`] - the decision procedure, its execution and
//!   in-flight sharing
//! - [`context`] - bounded prompt context from relevant memories
//! - [`cache`] - typed TTL caches and their lifecycle
//! - [`store`], [`embedder`], [`detector`] - concrete collaborators
//! - [`pipeline`] - the detector-gated entry point

pub mod cache;
pub mod context;
pub mod decision;
pub mod dedup;
pub mod detector;
pub mod embedder;
pub mod hashing;
pub mod pipeline;
pub mod recording;
pub mod similarity;
pub mod store;
pub mod types;

pub use cache::{CacheManager, CacheStats, SimilarityKey, TtlCache, UserContentKey};
pub use context::{PromptContextBuilder, DEFAULT_PROMPT};
pub use decision::DecisionThresholds;
pub use dedup::{DedupSettings, MemoryDeduplicator};
pub use detector::KeywordDetector;
pub use embedder::GeminiEmbedder;
pub use hashing::{normalize, ContentFingerprint, SemanticHasher};
pub use pipeline::{MemoryPipeline, MessageReport};
pub use similarity::{SimilarityEngine, SimilarityWeights};
pub use store::SqliteMemoryStore;
pub use types::{
    AppliedAction, DedupAction, DedupDecision, DedupOutcome, FallbackReason, HashOutcome,
    HashSource, MetricBreakdown, SimilarityResult,
};
