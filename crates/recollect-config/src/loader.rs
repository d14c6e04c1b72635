// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recollect.toml` > `~/.config/recollect/recollect.toml`
//! > `/etc/recollect/recollect.toml` with environment variable overrides via
//! the `RECOLLECT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RecollectConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/recollect/recollect.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "recollect.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/recollect/recollect.toml` (system-wide)
/// 3. `~/.config/recollect/recollect.toml` (user XDG config)
/// 4. `./recollect.toml` (local directory)
/// 5. `RECOLLECT_*` environment variables
pub fn load_config() -> Result<RecollectConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RecollectConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecollectConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RecollectConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecollectConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RecollectConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("recollect/recollect.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `RECOLLECT_DEDUP_MERGE_THRESHOLD` must map to
/// `dedup.merge_threshold`, not `dedup.merge.threshold`.
fn env_provider() -> Env {
    Env::prefixed("RECOLLECT_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env var name, in any case, to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    const SECTIONS: &[&str] = &[
        "service", "storage", "embedding", "dedup", "cache", "context", "detector",
    ];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(&format!("{section}_")) {
            if *section == "dedup" {
                if let Some(weight) = rest.strip_prefix("weights_") {
                    return format!("dedup.weights.{weight}");
                }
            }
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("embedding_api_key"), "embedding.api_key");
        assert_eq!(map_env_key("dedup_merge_threshold"), "dedup.merge_threshold");
        assert_eq!(map_env_key("cache_hash_ttl_secs"), "cache.hash_ttl_secs");
        assert_eq!(map_env_key("dedup_weights_ngram"), "dedup.weights.ngram");
    }

    #[test]
    fn uppercase_env_keys_are_lowercased() {
        assert_eq!(map_env_key("CACHE_HASH_TTL_SECS"), "cache.hash_ttl_secs");
        assert_eq!(map_env_key("Dedup_Weights_Jaccard"), "dedup.weights.jaccard");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
