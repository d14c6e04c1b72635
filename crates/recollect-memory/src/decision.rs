// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold policy and decision constructors.

use recollect_config::model::DedupConfig;
use recollect_core::MemoryId;

use crate::types::{DedupAction, DedupDecision, SimilarityResult};

/// Confidence of a skip on exact semantic hash match.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;
/// Confidence of a skip on a recently seen content fingerprint.
pub const SEEN_CONTENT_CONFIDENCE: f64 = 0.9;
/// Confidence of a create for a user without recent memories.
pub const FIRST_MEMORY_CONFIDENCE: f64 = 1.0;
/// Confidence of the create issued when the decision itself failed.
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Score thresholds separating create, update and merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionThresholds {
    pub merge: f64,
    pub update: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            merge: 0.6,
            update: 0.4,
        }
    }
}

impl From<&DedupConfig> for DecisionThresholds {
    fn from(config: &DedupConfig) -> Self {
        Self {
            merge: config.merge_threshold,
            update: config.update_threshold,
        }
    }
}

impl DecisionThresholds {
    /// Strictly above `merge` merges, strictly above `update` updates,
    /// anything else creates.
    pub fn classify(&self, score: f64) -> DedupAction {
        if score > self.merge {
            DedupAction::Merge
        } else if score > self.update {
            DedupAction::Update
        } else {
            DedupAction::Create
        }
    }

    /// Decision for the outcome of a fuzzy scan.
    pub fn decide(&self, semantic_hash: String, best: Option<SimilarityResult>) -> DedupDecision {
        let Some(best) = best else {
            return DedupDecision {
                action: DedupAction::Create,
                confidence: 1.0,
                reasoning: "no related memory in the recent window".to_string(),
                target: None,
                semantic_hash,
                best_match: None,
                degraded: None,
            };
        };

        let action = self.classify(best.score);
        let (confidence, target, reasoning) = match action {
            DedupAction::Merge => (
                best.score,
                Some(best.candidate_id.clone()),
                format!("similar memory found (score {:.3}), merging", best.score),
            ),
            DedupAction::Update => (
                best.score,
                Some(best.candidate_id.clone()),
                format!("related memory found (score {:.3}), updating", best.score),
            ),
            _ => (
                1.0 - best.score,
                None,
                format!("closest memory too different (score {:.3})", best.score),
            ),
        };
        DedupDecision {
            action,
            confidence,
            reasoning,
            target,
            semantic_hash,
            best_match: Some(best),
            degraded: None,
        }
    }
}

pub fn skip_exact(semantic_hash: String, existing: MemoryId) -> DedupDecision {
    DedupDecision {
        action: DedupAction::Skip,
        confidence: EXACT_MATCH_CONFIDENCE,
        reasoning: "exact semantic hash match".to_string(),
        target: Some(existing),
        semantic_hash,
        best_match: None,
        degraded: None,
    }
}

pub fn skip_seen(semantic_hash: String, existing: MemoryId) -> DedupDecision {
    DedupDecision {
        action: DedupAction::Skip,
        confidence: SEEN_CONTENT_CONFIDENCE,
        reasoning: "content seen recently".to_string(),
        target: Some(existing),
        semantic_hash,
        best_match: None,
        degraded: None,
    }
}

pub fn create_first(semantic_hash: String) -> DedupDecision {
    DedupDecision {
        action: DedupAction::Create,
        confidence: FIRST_MEMORY_CONFIDENCE,
        reasoning: "no existing memories".to_string(),
        target: None,
        semantic_hash,
        best_match: None,
        degraded: None,
    }
}

/// The forward-progress decision used when deduplication could not run.
pub fn create_fallback(semantic_hash: String, error: &str) -> DedupDecision {
    DedupDecision {
        action: DedupAction::Create,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: format!("deduplication unavailable, storing as new: {error}"),
        target: None,
        semantic_hash,
        best_match: None,
        degraded: Some(error.to_string()),
    }
}
