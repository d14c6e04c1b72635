// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter for deterministic testing.
//!
//! Each word seeds a pseudo-random dense vector; a text's embedding is the
//! normalized sum of its words' vectors. Identical text always embeds
//! identically and texts sharing words point in similar directions.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recollect_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, PluginAdapter,
    RecollectError,
};

pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    failing: AtomicBool,
    empty: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            empty: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    /// Number of `embed` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call return an embedding error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every following call return no vectors.
    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// The vector this mock returns for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let mut state = fnv1a(word.to_lowercase().as_bytes());
            for value in vector.iter_mut() {
                state = splitmix64(state);
                // Map the top 24 bits to [-1, 1).
                *value += ((state >> 40) as f32 / (1u64 << 23) as f32) - 1.0;
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("failure injected".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), RecollectError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecollectError::embedding("mock embedder failure"));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: self.dimensions,
            });
        }

        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> EmbeddingInput {
        EmbeddingInput {
            texts: vec![text.to_string()],
        }
    }

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed(input("i like tea")).await.unwrap();
        let b = embedder.embed(input("i like tea")).await.unwrap();
        assert_eq!(a.embeddings, b.embeddings);
        assert_eq!(a.embeddings[0].len(), 64);
        assert_eq!(embedder.calls(), 2);
    }

    #[test]
    fn vectors_are_dense_and_distinct() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.vector_for("i like hiking");
        let b = embedder.vector_for("my favorite color is blue");
        assert!(a.iter().all(|v| *v != 0.0));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn failure_and_empty_modes() {
        let embedder = MockEmbedder::new(8);
        embedder.set_failing(true);
        assert!(embedder.embed(input("x")).await.is_err());
        embedder.set_failing(false);
        embedder.set_empty(true);
        assert!(embedder.embed(input("x")).await.unwrap().embeddings.is_empty());
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_applied() {
        let embedder = MockEmbedder::new(8);
        embedder.set_delay(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        embedder.embed(input("x")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
