// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based memory-worthiness detector.
//!
//! Accepts first-person statements of facts and preferences and explicit
//! "remember ..." requests. Everything else is ignored.

use async_trait::async_trait;
use recollect_config::model::DetectorConfig;
use recollect_core::{
    AdapterType, Detection, HealthStatus, MemoryDetector, PluginAdapter, RecollectError,
};
use regex::Regex;

const MEMORY_PATTERNS: &[&str] = &[
    r"\bi (really |absolutely |usually |always )?(like|love|enjoy|prefer|hate|dislike)\b",
    r"\bmy (favou?rite|name|birthday|job|wife|husband|partner|dog|cat|kids?|son|daughter)\b",
    r"\bi('m| am) (a|an|from|allergic|vegetarian|vegan|learning|working|studying)\b",
    r"\bi (work|live|study|grew up)\b",
    r"\bi (have|own) (a|an|two|three)\b",
    r"\bremember\b",
    r"\bdon'?t forget\b",
];

const REMEMBER_PREFIX: &str = r"^(please\s+)?(remember|note|don'?t forget)(\s+that)?[\s,:]+";

pub struct KeywordDetector {
    patterns: Vec<Regex>,
    remember_prefix: Regex,
    min_length: usize,
}

impl KeywordDetector {
    pub fn new(min_length: usize) -> Result<Self, RecollectError> {
        let compile = |pattern: &str| {
            Regex::new(&format!("(?i){pattern}")).map_err(|e| {
                RecollectError::Internal(format!("invalid detector pattern `{pattern}`: {e}"))
            })
        };
        Ok(Self {
            patterns: MEMORY_PATTERNS
                .iter()
                .map(|p| compile(p))
                .collect::<Result<_, _>>()?,
            remember_prefix: compile(REMEMBER_PREFIX)?,
            min_length,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, RecollectError> {
        Self::new(config.min_length)
    }

    /// Classify `message` synchronously.
    pub fn classify(&self, message: &str) -> Detection {
        let trimmed = message.trim();
        if trimmed.chars().count() < self.min_length {
            return Detection::ignore();
        }
        if !self.patterns.iter().any(|p| p.is_match(trimmed)) {
            return Detection::ignore();
        }

        let extracted = self.remember_prefix.replace(trimmed, "");
        let extracted = extracted.trim();
        if extracted.chars().count() < self.min_length {
            return Detection::ignore();
        }
        Detection {
            should_remember: true,
            extracted_content: extracted.to_string(),
        }
    }
}

#[async_trait]
impl PluginAdapter for KeywordDetector {
    fn name(&self) -> &str {
        "keyword-detector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Detector
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecollectError> {
        Ok(())
    }
}

#[async_trait]
impl MemoryDetector for KeywordDetector {
    async fn detect(&self, message: &str) -> Result<Detection, RecollectError> {
        Ok(self.classify(message))
    }
}
