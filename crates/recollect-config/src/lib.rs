// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the recollect memory cache.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `RECOLLECT_*` environment variable overrides, and
//! diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use recollect_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("merge above {}", config.dedup.merge_threshold);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, render_report, ConfigError, SourceFile};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RecollectConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// On a Figment error the TOML files are re-read so diagnostics can point
/// at the offending key.
pub fn load_and_validate() -> Result<RecollectConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<RecollectConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<RecollectConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![SourceFile::new(diagnostic::INLINE_SOURCE, toml_content)]
    })
}

fn finish(
    loaded: Result<RecollectConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<SourceFile>,
) -> Result<RecollectConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            tracing::debug!(
                merge_threshold = config.dedup.merge_threshold,
                update_threshold = config.dedup.update_threshold,
                provider = %config.embedding.provider,
                "configuration loaded"
            );
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<SourceFile> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| SourceFile::new(path.display().to_string(), content))
}

/// Every config file of the search hierarchy that exists.
fn collect_toml_sources() -> Vec<SourceFile> {
    let local = std::env::current_dir()
        .map(|dir| dir.join(loader::LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG_FILE.into());
    let user = dirs::config_dir().map(|dir| dir.join("recollect").join("recollect.toml"));

    [Some(local), user, Some(Path::new(loader::SYSTEM_CONFIG_PATH).to_path_buf())]
        .into_iter()
        .flatten()
        .filter_map(|path| read_source(&path))
        .collect()
}
