// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ordering, weight sums, finite scores and TTL ordering.

use crate::diagnostic::ConfigError;
use crate::model::{RecollectConfig, EMBEDDING_PROVIDERS};

/// Tolerance on the sum of similarity weights.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RecollectConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    // Embedding provider
    let embedding = &config.embedding;
    if !EMBEDDING_PROVIDERS.contains(&embedding.provider.as_str()) {
        fail(format!(
            "embedding.provider `{}` is not one of: {}",
            embedding.provider,
            EMBEDDING_PROVIDERS.join(", ")
        ));
    }
    if embedding.provider == "gemini"
        && embedding
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty())
    {
        fail("embedding.api_key is required when embedding.provider = \"gemini\"".to_string());
    }
    if embedding.dimensions == 0 {
        fail("embedding.dimensions must be at least 1".to_string());
    }
    if embedding.hash_prefix_dims == 0 || embedding.hash_prefix_dims > embedding.dimensions {
        fail(format!(
            "embedding.hash_prefix_dims must be between 1 and embedding.dimensions ({}), got {}",
            embedding.dimensions, embedding.hash_prefix_dims
        ));
    }
    if embedding.timeout_ms == 0 {
        fail("embedding.timeout_ms must be greater than 0".to_string());
    }

    // Dedup thresholds
    let dedup = &config.dedup;
    for (name, value) in [
        ("merge_threshold", dedup.merge_threshold),
        ("update_threshold", dedup.update_threshold),
        ("similarity_floor", dedup.similarity_floor),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            fail(format!("dedup.{name} must be within [0, 1], got {value}"));
        }
    }
    if dedup.update_threshold >= dedup.merge_threshold {
        fail(format!(
            "dedup.update_threshold ({}) must be below dedup.merge_threshold ({})",
            dedup.update_threshold, dedup.merge_threshold
        ));
    }
    if dedup.similarity_floor > dedup.update_threshold {
        fail(format!(
            "dedup.similarity_floor ({}) must not exceed dedup.update_threshold ({})",
            dedup.similarity_floor, dedup.update_threshold
        ));
    }
    if dedup.recent_window_hours == 0 {
        fail("dedup.recent_window_hours must be at least 1".to_string());
    }
    if dedup.timestamp_bucket_secs == 0 {
        fail("dedup.timestamp_bucket_secs must be greater than 0".to_string());
    }

    let weights = &dedup.weights;
    let all_weights = [
        ("jaccard", weights.jaccard),
        ("overlap", weights.overlap),
        ("edit", weights.edit),
        ("ngram", weights.ngram),
    ];
    for (name, value) in all_weights {
        if !value.is_finite() {
            fail(format!("dedup.weights.{name} must be a finite number, got {value}"));
        } else if value < 0.0 {
            fail(format!("dedup.weights.{name} must be non-negative, got {value}"));
        }
    }
    let sum: f64 = all_weights.iter().map(|(_, w)| w).sum();
    if sum.is_finite() && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        fail(format!("dedup.weights must sum to 1.0, got {sum:.3}"));
    }

    // Cache TTLs
    let cache = &config.cache;
    for (name, value) in [
        ("general_ttl_secs", cache.general_ttl_secs),
        ("similarity_ttl_secs", cache.similarity_ttl_secs),
        ("hash_ttl_secs", cache.hash_ttl_secs),
        ("sweep_interval_secs", cache.sweep_interval_secs),
    ] {
        if value == 0 {
            fail(format!("cache.{name} must be greater than 0"));
        }
    }
    // The hash class is the longest-lived.
    if cache.hash_ttl_secs > 0 {
        for (name, value) in [
            ("general_ttl_secs", cache.general_ttl_secs),
            ("similarity_ttl_secs", cache.similarity_ttl_secs),
        ] {
            if cache.hash_ttl_secs < value {
                fail(format!(
                    "cache.hash_ttl_secs ({}) must be at least cache.{name} ({value})",
                    cache.hash_ttl_secs
                ));
            }
        }
    }

    if config.context.max_memories == 0 {
        fail("context.max_memories must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
