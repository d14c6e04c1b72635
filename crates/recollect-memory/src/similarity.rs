// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-metric fuzzy similarity between a new message and stored memories.
//!
//! Four metrics, each in [0, 1], are combined with fixed weights:
//! word-set Jaccard, overlap coefficient, normalized Levenshtein over the
//! whole string, and Jaccard over word bigrams.

use std::collections::HashSet;
use std::sync::Arc;

use recollect_config::model::SimilarityWeightsConfig;
use recollect_core::MemoryRecord;

use crate::cache::{CacheManager, SimilarityKey};
use crate::hashing::{normalize, ContentFingerprint};
use crate::types::{MetricBreakdown, SimilarityResult};

/// Weights of the four metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub jaccard: f64,
    pub overlap: f64,
    pub edit: f64,
    pub ngram: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            jaccard: 0.35,
            overlap: 0.25,
            edit: 0.25,
            ngram: 0.15,
        }
    }
}

impl From<&SimilarityWeightsConfig> for SimilarityWeights {
    fn from(config: &SimilarityWeightsConfig) -> Self {
        Self {
            jaccard: config.jaccard,
            overlap: config.overlap,
            edit: config.edit,
            ngram: config.ngram,
        }
    }
}

impl SimilarityWeights {
    pub fn combine(&self, m: &MetricBreakdown) -> f64 {
        let score = self.jaccard * m.jaccard
            + self.overlap * m.overlap
            + self.edit * m.edit
            + self.ngram * m.ngram;
        score.clamp(0.0, 1.0)
    }
}

fn word_set(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

fn set_jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let total = a.union(b).count();
    shared as f64 / total as f64
}

/// Shared distinct words over all distinct words.
pub fn jaccard(a: &str, b: &str) -> f64 {
    set_jaccard(&word_set(a), &word_set(b))
}

/// Shared distinct words over the smaller word set.
pub fn overlap_coefficient(a: &str, b: &str) -> f64 {
    let (a, b) = (word_set(a), word_set(b));
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 };
    }
    a.intersection(&b).count() as f64 / smaller as f64
}

/// Levenshtein distance normalized by the longer string.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Jaccard over word bigrams. If either side has fewer than two words,
/// both sides are compared as unigram sets.
pub fn ngram_similarity(a: &str, b: &str) -> f64 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.len() < 2 || b_words.len() < 2 {
        return set_jaccard(
            &a_words.into_iter().collect(),
            &b_words.into_iter().collect(),
        );
    }
    let bigrams = |words: &[&str]| -> HashSet<(String, String)> {
        words
            .windows(2)
            .map(|w| (w[0].to_string(), w[1].to_string()))
            .collect()
    };
    set_jaccard(&bigrams(&a_words), &bigrams(&b_words))
}

/// All four metrics over two already-normalized texts.
pub fn breakdown(a: &str, b: &str) -> MetricBreakdown {
    MetricBreakdown {
        jaccard: jaccard(a, b),
        overlap: overlap_coefficient(a, b),
        edit: edit_similarity(a, b),
        ngram: ngram_similarity(a, b),
    }
}

/// Scores candidates and picks the best match above the floor.
pub struct SimilarityEngine {
    weights: SimilarityWeights,
    floor: f64,
    caches: Arc<CacheManager>,
}

impl SimilarityEngine {
    pub fn new(weights: SimilarityWeights, floor: f64, caches: Arc<CacheManager>) -> Self {
        Self {
            weights,
            floor,
            caches,
        }
    }

    /// Combined score of two texts. Both sides are normalized first.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        self.weights.combine(&breakdown(&normalize(a), &normalize(b)))
    }

    /// Compare `normalized` (fingerprinted as `fingerprint`) against one record,
    /// consulting the similarity cache.
    pub fn compare(
        &self,
        fingerprint: &ContentFingerprint,
        normalized: &str,
        candidate: &MemoryRecord,
    ) -> SimilarityResult {
        let key = SimilarityKey {
            fingerprint: fingerprint.clone(),
            candidate: candidate.id.clone(),
        };
        if let Some(hit) = self.caches.similarity.get(&key) {
            return hit;
        }

        let metrics = breakdown(normalized, &normalize(&candidate.content));
        let result = SimilarityResult {
            candidate_id: candidate.id.clone(),
            score: self.weights.combine(&metrics),
            breakdown: metrics,
        };
        self.caches.similarity.insert(key, result.clone());
        result
    }

    /// Highest-scoring candidate strictly above the floor. Ties keep the
    /// earlier candidate.
    pub fn find_best_match(
        &self,
        new_text: &str,
        candidates: &[MemoryRecord],
    ) -> Option<SimilarityResult> {
        let normalized = normalize(new_text);
        let fingerprint = ContentFingerprint::of(&normalized);

        let mut best: Option<SimilarityResult> = None;
        for candidate in candidates {
            let result = self.compare(&fingerprint, &normalized, candidate);
            if result.score <= self.floor {
                continue;
            }
            if best.as_ref().is_none_or(|b| result.score > b.score) {
                best = Some(result);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use recollect_core::{MemoryId, UserId};
    use std::time::Duration;

    fn engine() -> SimilarityEngine {
        let caches = Arc::new(CacheManager::with_ttls(
            Duration::from_secs(300),
            Duration::from_secs(600),
            Duration::from_secs(1800),
        ));
        SimilarityEngine::new(SimilarityWeights::default(), 0.15, caches)
    }

    fn record(id: &str, content: &str) -> MemoryRecord {
        let now = chrono::Utc::now();
        MemoryRecord {
            id: MemoryId(id.into()),
            user_id: UserId::new("u"),
            content: content.into(),
            semantic_hash: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn metrics_on_hiking_pair() {
        let a = "i like hiking on weekends";
        let b = "i really like hiking on weekends";
        assert!((jaccard(a, b) - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(overlap_coefficient(a, b), 1.0);
        assert!((ngram_similarity(a, b) - 0.5).abs() < 1e-9);
        assert!((edit_similarity(a, b) - (1.0 - 7.0 / 32.0)).abs() < 1e-9);
    }

    #[test]
    fn rephrased_statement_scores_in_merge_range() {
        let score = engine().score("I like hiking on weekends", "I really like hiking on weekends");
        assert!(score > 0.7 && score < 0.85, "score = {score}");
    }

    #[test]
    fn unrelated_statement_scores_below_floor() {
        let score = engine().score("my favorite color is blue", "I like hiking on weekends");
        assert!(score < 0.15, "score = {score}");
    }

    #[test]
    fn single_word_ngram_falls_back_to_unigrams() {
        assert_eq!(ngram_similarity("coffee", "coffee"), 1.0);
        assert_eq!(ngram_similarity("coffee", "i like coffee"), 1.0 / 3.0);
    }

    #[test]
    fn overlap_rewards_subsets() {
        assert_eq!(overlap_coefficient("likes tea", "she likes green tea"), 1.0);
        assert!(jaccard("likes tea", "she likes green tea") < 1.0);
    }

    #[test]
    fn best_match_excludes_floor_and_picks_highest() {
        let engine = engine();
        let candidates = vec![
            record("colour", "my favorite color is blue"),
            record("hike-1", "I like hiking"),
            record("hike-2", "I like hiking on weekends"),
        ];
        let best = engine
            .find_best_match("I really like hiking on weekends", &candidates)
            .unwrap();
        assert_eq!(best.candidate_id, MemoryId("hike-2".into()));

        assert!(engine
            .find_best_match("the train leaves at noon", &candidates[..1])
            .is_none());
    }

    #[test]
    fn score_equal_to_floor_is_not_a_match() {
        let caches = Arc::new(CacheManager::with_ttls(
            Duration::from_secs(300),
            Duration::from_secs(600),
            Duration::from_secs(1800),
        ));
        let jaccard_only = SimilarityWeights {
            jaccard: 1.0,
            overlap: 0.0,
            edit: 0.0,
            ngram: 0.0,
        };
        let engine = SimilarityEngine::new(jaccard_only, 1.0 / 3.0, caches);
        assert_eq!(engine.score("a b", "a c"), 1.0 / 3.0);

        let best = engine.find_best_match("a b", &[record("m1", "a c")]);
        assert!(best.is_none());

        let thresholds = crate::decision::DecisionThresholds {
            merge: 0.6,
            update: 0.4,
        };
        let decision = thresholds.decide("hash".into(), best);
        assert_eq!(decision.action, crate::types::DedupAction::Create);
        assert_eq!(decision.target, None);
    }

    #[test]
    fn compare_populates_similarity_cache() {
        let engine = engine();
        let candidates = vec![record("m1", "I like tea")];
        engine.find_best_match("I like green tea", &candidates);
        assert_eq!(engine.caches.similarity.len(), 1);
        engine.find_best_match("I like green tea", &candidates);
        assert_eq!(engine.caches.similarity.len(), 1);
    }

    proptest! {
        #[test]
        fn combined_score_is_bounded(a in "[a-z ]{0,40}", b in "[a-z ]{0,40}") {
            let s = engine().score(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn metrics_are_symmetric(a in "[a-z]{1,6}( [a-z]{1,6}){0,6}", b in "[a-z]{1,6}( [a-z]{1,6}){0,6}") {
            let (x, y) = (breakdown(&a, &b), breakdown(&b, &a));
            prop_assert!((x.jaccard - y.jaccard).abs() < 1e-12);
            prop_assert!((x.overlap - y.overlap).abs() < 1e-12);
            prop_assert!((x.edit - y.edit).abs() < 1e-12);
            prop_assert!((x.ngram - y.ngram).abs() < 1e-12);
        }

        #[test]
        fn identical_text_scores_one(a in "[a-z]{1,6}( [a-z]{1,6}){0,6}") {
            let s = engine().score(&a, &a);
            prop_assert!((s - 1.0).abs() < 1e-9);
        }
    }
}
