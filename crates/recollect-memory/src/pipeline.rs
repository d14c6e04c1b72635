// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline: detector gate, deduplication, and prompt context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use recollect_config::RecollectConfig;
use recollect_core::{
    Detection, EmbeddingAdapter, HealthStatus, MemoryDetector, MemoryStoreAdapter,
    PluginAdapter, RecollectError, UserId,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::context::PromptContextBuilder;
use crate::dedup::{DedupSettings, MemoryDeduplicator};
use crate::recording;
use crate::types::DedupOutcome;

/// What happened to one incoming message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageReport {
    pub detection: Detection,
    /// `None` when the detector decided the message is not worth remembering.
    pub outcome: Option<DedupOutcome>,
}

/// Entry point for a chat service: one instance per process, shared by handle.
pub struct MemoryPipeline {
    store: Arc<dyn MemoryStoreAdapter>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    detector: Arc<dyn MemoryDetector>,
    deduplicator: MemoryDeduplicator,
    context: PromptContextBuilder,
    caches: Arc<CacheManager>,
}

impl MemoryPipeline {
    pub fn new(
        config: &RecollectConfig,
        store: Arc<dyn MemoryStoreAdapter>,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
        detector: Arc<dyn MemoryDetector>,
    ) -> Self {
        let caches = Arc::new(CacheManager::new(&config.cache));
        let settings = DedupSettings::from_config(&config.dedup, &config.embedding);
        let deduplicator = MemoryDeduplicator::new(
            Arc::clone(&store),
            embedder.clone(),
            Arc::clone(&caches),
            settings,
        );
        let context =
            PromptContextBuilder::new(Arc::clone(&store), Arc::clone(&caches), &config.context);
        Self {
            store,
            embedder,
            detector,
            deduplicator,
            context,
            caches,
        }
    }

    /// Gate `message` through the detector and deduplicate what it extracts.
    ///
    /// A failing detector is treated as "nothing to remember".
    pub async fn handle_message(
        &self,
        user: &UserId,
        message: &str,
        at: DateTime<Utc>,
    ) -> MessageReport {
        let detection = match self.detector.detect(message).await {
            Ok(detection) => detection,
            Err(e) => {
                warn!(user = %user, error = %e, "memory detector failed, skipping message");
                recording::record_fallback("detector");
                Detection::ignore()
            }
        };

        if !detection.should_remember || detection.extracted_content.trim().is_empty() {
            debug!(user = %user, "message not memory-worthy");
            return MessageReport {
                detection,
                outcome: None,
            };
        }

        let outcome = self
            .deduplicator
            .process(user, &detection.extracted_content, at)
            .await;
        MessageReport {
            detection,
            outcome: Some(outcome),
        }
    }

    /// Prompt context for the user's current message.
    pub async fn context_for(&self, user: &UserId, message: &str) -> String {
        self.context.build(user, message).await
    }

    pub fn deduplicator(&self) -> &MemoryDeduplicator {
        &self.deduplicator
    }

    pub fn caches(&self) -> &Arc<CacheManager> {
        &self.caches
    }

    /// Health of the whole pipeline.
    ///
    /// Only the store is required. A sick embedder or detector leaves the
    /// pipeline working with fallbacks, which is reported as degraded.
    pub async fn health(&self) -> HealthStatus {
        let mut problems = Vec::new();
        if let Some((fatal, reason)) = component_problem(self.store.as_ref()).await {
            if fatal {
                return HealthStatus::Unhealthy(reason);
            }
            problems.push(reason);
        }
        if let Some(embedder) = &self.embedder {
            if let Some((_, reason)) = component_problem(embedder.as_ref()).await {
                problems.push(reason);
            }
        }
        if let Some((_, reason)) = component_problem(self.detector.as_ref()).await {
            problems.push(reason);
        }

        if problems.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(problems.join("; "))
        }
    }

    /// Shut down the detector, the embedder and the store, in that order.
    ///
    /// Every component is shut down even if an earlier one fails; the first
    /// error is returned.
    pub async fn shutdown(&self) -> Result<(), RecollectError> {
        let mut results = vec![self.detector.shutdown().await];
        if let Some(embedder) = &self.embedder {
            results.push(embedder.shutdown().await);
        }
        results.push(self.store.shutdown().await);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            warn!(error = %err, "component shutdown failed");
        }
        debug!("memory pipeline shut down");
        results.into_iter().collect()
    }

    /// Start the periodic cache sweeper; stops when `cancel` fires.
    pub fn spawn_sweeper(
        &self,
        interval: std::time::Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        self.caches.spawn_sweeper(interval, cancel)
    }
}

/// `None` when `adapter` is healthy, otherwise whether the problem is
/// fatal and a description naming the adapter.
async fn component_problem<A: PluginAdapter + ?Sized>(adapter: &A) -> Option<(bool, String)> {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => None,
        Ok(HealthStatus::Degraded(reason)) => Some((false, format!("{}: {reason}", adapter.name()))),
        Ok(HealthStatus::Unhealthy(reason)) => Some((true, format!("{}: {reason}", adapter.name()))),
        Err(e) => Some((true, format!("{}: {e}", adapter.name()))),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use recollect_core::AdapterType;
    use recollect_test_utils::{InMemoryStore, MockEmbedder};

    use super::*;
    use crate::detector::KeywordDetector;

    struct BrokenDetector;

    #[async_trait]
    impl PluginAdapter for BrokenDetector {
        fn name(&self) -> &str {
            "broken"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Detector
        }

        async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
            Ok(HealthStatus::Unhealthy("always fails".into()))
        }

        async fn shutdown(&self) -> Result<(), RecollectError> {
            Ok(())
        }
    }

    #[async_trait]
    impl MemoryDetector for BrokenDetector {
        async fn detect(&self, _message: &str) -> Result<Detection, RecollectError> {
            Err(RecollectError::Internal("classifier offline".into()))
        }
    }

    fn pipeline(store: Arc<InMemoryStore>, detector: Arc<dyn MemoryDetector>) -> MemoryPipeline {
        MemoryPipeline::new(&RecollectConfig::default(), store, None, detector)
    }

    #[tokio::test]
    async fn failing_detector_skips_message() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline(Arc::clone(&store), Arc::new(BrokenDetector));

        let report = pipeline
            .handle_message(&UserId::new("u"), "I like hiking on weekends", Utc::now())
            .await;

        assert_eq!(report.detection, Detection::ignore());
        assert!(report.outcome.is_none());
        assert_eq!(store.mutations(), 0);
    }

    #[tokio::test]
    async fn stored_memory_shows_up_in_context() {
        let store = Arc::new(InMemoryStore::new());
        let detector = Arc::new(KeywordDetector::new(8).unwrap());
        let pipeline = pipeline(Arc::clone(&store), detector);
        let user = UserId::new("u");

        pipeline
            .handle_message(&user, "my dog is called Rex", Utc::now())
            .await;
        let context = pipeline.context_for(&user, "how is my dog doing?").await;

        assert!(context.contains("my dog is called Rex."), "{context}");
    }

    #[tokio::test]
    async fn health_is_healthy_when_every_component_is() {
        let store = Arc::new(InMemoryStore::new());
        let detector = Arc::new(KeywordDetector::new(8).unwrap());
        let pipeline = pipeline(store, detector);
        assert_eq!(pipeline.health().await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn sick_embedder_and_detector_degrade_health() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(MockEmbedder::new(64));
        embedder.set_failing(true);
        let pipeline = MemoryPipeline::new(
            &RecollectConfig::default(),
            store,
            Some(embedder as Arc<dyn EmbeddingAdapter>),
            Arc::new(BrokenDetector),
        );

        match pipeline.health().await {
            HealthStatus::Degraded(reason) => {
                assert!(reason.contains("mock-embedder: failure injected"), "{reason}");
                assert!(reason.contains("broken: always fails"), "{reason}");
            }
            other => panic!("expected degraded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_store_makes_pipeline_unhealthy() {
        let store = Arc::new(InMemoryStore::new());
        store.set_failing(true);
        let pipeline = pipeline(store, Arc::new(BrokenDetector));
        assert_eq!(
            pipeline.health().await,
            HealthStatus::Unhealthy("in-memory-store: failure injected".into())
        );
    }

    #[tokio::test]
    async fn shutdown_reaches_the_store() {
        let store = Arc::new(InMemoryStore::new());
        let detector = Arc::new(KeywordDetector::new(8).unwrap());
        let pipeline = pipeline(Arc::clone(&store), detector);

        pipeline.shutdown().await.unwrap();
        assert_eq!(store.shutdown_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancel() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline(store, Arc::new(BrokenDetector));
        let cancel = CancellationToken::new();

        let handle = pipeline.spawn_sweeper(Duration::from_secs(60), cancel.clone());
        tokio::time::sleep(Duration::from_secs(130)).await;
        cancel.cancel();

        handle.await.unwrap();
        assert_eq!(pipeline.caches().stats().total(), 0);
    }
}
