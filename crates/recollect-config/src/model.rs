// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the recollect memory cache.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level recollect configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecollectConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite memory store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding provider and semantic hash settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Deduplication thresholds and similarity weights.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Cache TTLs per cache class.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Prompt context builder limits.
    #[serde(default)]
    pub context: ContextConfig,

    /// Memory-worthiness detector settings.
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "recollect".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite memory store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "recollect.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Known embedding provider names.
pub const EMBEDDING_PROVIDERS: &[&str] = &["gemini", "disabled"];

/// Embedding provider and semantic hash configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Provider name: "gemini" or "disabled". When disabled, semantic hashes
    /// are plain content digests.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the hosted provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of the embedding API.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Expected embedding dimensionality.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Number of leading vector components hashed into the semantic hash.
    #[serde(default = "default_hash_prefix_dims")]
    pub hash_prefix_dims: usize,

    /// Upper bound on one embedding call, in milliseconds.
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            dimensions: default_dimensions(),
            hash_prefix_dims: default_hash_prefix_dims(),
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".to_string()
}

fn default_embedding_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_hash_prefix_dims() -> usize {
    32
}

fn default_embedding_timeout_ms() -> u64 {
    5000
}

/// Deduplication decision thresholds.
///
/// These are business policy tuned against real traffic, not derived constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Best-match score strictly above this merges into the existing record.
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,

    /// Best-match score strictly above this (and not above merge) updates the record.
    #[serde(default = "default_update_threshold")]
    pub update_threshold: f64,

    /// Candidates scoring at or below this are not considered related at all.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f64,

    /// Only records created within this many hours are scanned for fuzzy matches.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: u32,

    /// Width of the timestamp bucket used to share in-flight work.
    #[serde(default = "default_timestamp_bucket_secs")]
    pub timestamp_bucket_secs: u64,

    /// Weights of the four similarity metrics.
    #[serde(default)]
    pub weights: SimilarityWeightsConfig,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            merge_threshold: default_merge_threshold(),
            update_threshold: default_update_threshold(),
            similarity_floor: default_similarity_floor(),
            recent_window_hours: default_recent_window_hours(),
            timestamp_bucket_secs: default_timestamp_bucket_secs(),
            weights: SimilarityWeightsConfig::default(),
        }
    }
}

fn default_merge_threshold() -> f64 {
    0.6
}

fn default_update_threshold() -> f64 {
    0.4
}

fn default_similarity_floor() -> f64 {
    0.15
}

fn default_recent_window_hours() -> u32 {
    72
}

fn default_timestamp_bucket_secs() -> u64 {
    60
}

/// Weights of the combined similarity score. Must sum to 1.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimilarityWeightsConfig {
    /// Word-set Jaccard similarity.
    #[serde(default = "default_jaccard_weight")]
    pub jaccard: f64,

    /// Overlap coefficient (shared words over the smaller set).
    #[serde(default = "default_overlap_weight")]
    pub overlap: f64,

    /// Normalized edit-distance similarity.
    #[serde(default = "default_edit_weight")]
    pub edit: f64,

    /// Word-bigram similarity.
    #[serde(default = "default_ngram_weight")]
    pub ngram: f64,
}

impl Default for SimilarityWeightsConfig {
    fn default() -> Self {
        Self {
            jaccard: default_jaccard_weight(),
            overlap: default_overlap_weight(),
            edit: default_edit_weight(),
            ngram: default_ngram_weight(),
        }
    }
}

fn default_jaccard_weight() -> f64 {
    0.35
}

fn default_overlap_weight() -> f64 {
    0.25
}

fn default_edit_weight() -> f64 {
    0.25
}

fn default_ngram_weight() -> f64 {
    0.15
}

/// Cache TTLs per cache class.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// TTL of the prompt and memory-retrieval caches.
    #[serde(default = "default_general_ttl_secs")]
    pub general_ttl_secs: u64,

    /// TTL of the pairwise similarity cache.
    #[serde(default = "default_similarity_ttl_secs")]
    pub similarity_ttl_secs: u64,

    /// TTL of the hash, embedding and seen-content caches.
    #[serde(default = "default_hash_ttl_secs")]
    pub hash_ttl_secs: u64,

    /// Interval of the background sweeper.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            general_ttl_secs: default_general_ttl_secs(),
            similarity_ttl_secs: default_similarity_ttl_secs(),
            hash_ttl_secs: default_hash_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_general_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_similarity_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_hash_ttl_secs() -> u64 {
    1800 // 30 minutes
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Prompt context builder limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Maximum number of memories included in the context block.
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,

    /// Maximum characters of memory text included in the context block.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_memories: default_max_memories(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_memories() -> usize {
    5
}

fn default_max_chars() -> usize {
    1500
}

/// Memory-worthiness detector settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    /// Messages shorter than this (after trimming) are never remembered.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
        }
    }
}

fn default_min_length() -> usize {
    8
}
