// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the recollect configuration system.

use recollect_config::diagnostic::ConfigError;
use recollect_config::model::RecollectConfig;
use recollect_config::{load_and_validate_str, load_config, load_config_from_str};
use serial_test::serial;

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_recollect_config() {
    let toml = r#"
[service]
name = "recollect-test"
log_level = "debug"

[storage]
database_path = "/tmp/memories.db"
wal_mode = false

[embedding]
provider = "gemini"
api_key = "test-key"
dimensions = 256
hash_prefix_dims = 16
timeout_ms = 1500

[dedup]
merge_threshold = 0.7
update_threshold = 0.5
similarity_floor = 0.2
recent_window_hours = 24
timestamp_bucket_secs = 30

[dedup.weights]
jaccard = 0.4
overlap = 0.2
edit = 0.2
ngram = 0.2

[cache]
general_ttl_secs = 60
similarity_ttl_secs = 120
hash_ttl_secs = 900
sweep_interval_secs = 15

[context]
max_memories = 3
max_chars = 500

[detector]
min_length = 12
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "recollect-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/memories.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.embedding.provider, "gemini");
    assert_eq!(config.embedding.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.embedding.dimensions, 256);
    assert_eq!(config.embedding.hash_prefix_dims, 16);
    assert_eq!(config.embedding.timeout_ms, 1500);
    assert_eq!(config.dedup.merge_threshold, 0.7);
    assert_eq!(config.dedup.update_threshold, 0.5);
    assert_eq!(config.dedup.recent_window_hours, 24);
    assert_eq!(config.dedup.weights.jaccard, 0.4);
    assert_eq!(config.cache.similarity_ttl_secs, 120);
    assert_eq!(config.context.max_memories, 3);
    assert_eq!(config.detector.min_length, 12);
}

/// Empty TOML yields the documented defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "recollect");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.storage.database_path, "recollect.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.embedding.provider, "disabled");
    assert!(config.embedding.api_key.is_none());
    assert_eq!(config.embedding.hash_prefix_dims, 32);
    assert_eq!(config.dedup.merge_threshold, 0.6);
    assert_eq!(config.dedup.update_threshold, 0.4);
    assert_eq!(config.dedup.similarity_floor, 0.15);
    assert_eq!(config.cache.general_ttl_secs, 300);
    assert_eq!(config.cache.similarity_ttl_secs, 600);
    assert_eq!(config.cache.hash_ttl_secs, 1800);
    assert_eq!(config.context.max_memories, 5);
}

#[test]
fn unknown_field_produces_suggestion() {
    let toml = r#"
[dedup]
merge_treshold = 0.7
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "merge_treshold");
            assert_eq!(suggestion.as_deref(), Some("merge_threshold"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[cache]
hash_ttl_secs = "soon"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("hash_ttl_secs"))),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_validation_runs_after_parsing() {
    let toml = r#"
[dedup]
merge_threshold = 0.3
update_threshold = 0.4
"#;

    let errors = load_and_validate_str(toml).expect_err("inverted thresholds must fail");
    assert!(errors
        .iter()
        .all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn nan_weight_in_toml_is_rejected() {
    let toml = r#"
[dedup.weights]
jaccard = nan
"#;

    let errors = load_and_validate_str(toml).expect_err("nan weight must fail");
    assert!(
        errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("dedup.weights.jaccard"))
        ),
        "got: {errors:?}"
    );
}

#[test]
fn defaults_validate() {
    let config = RecollectConfig::default();
    assert!(recollect_config::validation::validate_config(&config).is_ok());
}

/// `RECOLLECT_*` variables override file values, with underscore-containing
/// keys mapped to their section.
#[test]
#[serial]
fn env_vars_override_local_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "recollect.toml",
            r#"
[dedup]
merge_threshold = 0.65

[embedding]
provider = "gemini"
"#,
        )?;
        jail.set_env("RECOLLECT_DEDUP_MERGE_THRESHOLD", "0.75");
        jail.set_env("RECOLLECT_EMBEDDING_API_KEY", "from-env");
        jail.set_env("RECOLLECT_CACHE_HASH_TTL_SECS", "42");

        let config = load_config()?;
        assert_eq!(config.dedup.merge_threshold, 0.75);
        assert_eq!(config.embedding.provider, "gemini");
        assert_eq!(config.embedding.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.cache.hash_ttl_secs, 42);
        Ok(())
    });
}

#[test]
#[serial]
fn missing_config_files_silently_skipped() {
    let config = recollect_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/path/recollect.toml",
    ))
    .expect("missing file should be skipped");
    assert_eq!(config.service.name, "recollect");
}
