// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations over a SQLite-backed memory pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use recollect_config::model::RecollectConfig;
use recollect_core::{
    EmbeddingAdapter, HealthStatus, MemoryId, MemoryStoreAdapter, RecollectError, UserId,
};
use recollect_memory::{GeminiEmbedder, KeywordDetector, MemoryPipeline, SqliteMemoryStore};
use tracing::{debug, info};

/// Pipeline plus a handle on its concrete store for maintenance commands.
pub struct App {
    pub pipeline: MemoryPipeline,
    pub store: Arc<SqliteMemoryStore>,
}

/// Open the store and wire up the pipeline described by `config`.
pub async fn open_app(config: &RecollectConfig) -> Result<App, RecollectError> {
    let store = Arc::new(
        SqliteMemoryStore::open(&config.storage.database_path, config.storage.wal_mode).await?,
    );
    debug!(path = %config.storage.database_path, "memory store opened");

    let embedder: Option<Arc<dyn EmbeddingAdapter>> = match config.embedding.provider.as_str() {
        "gemini" => Some(
            Arc::new(GeminiEmbedder::from_config(&config.embedding)?) as Arc<dyn EmbeddingAdapter>,
        ),
        _ => None,
    };
    let detector = Arc::new(KeywordDetector::from_config(&config.detector)?);

    let pipeline = MemoryPipeline::new(
        config,
        Arc::clone(&store) as Arc<dyn MemoryStoreAdapter>,
        embedder,
        detector,
    );
    Ok(App { pipeline, store })
}

/// Run `recollect remember`: prints the message report as JSON.
pub async fn run_remember(
    config: &RecollectConfig,
    user: &str,
    at: Option<DateTime<Utc>>,
    message: &str,
) -> Result<(), RecollectError> {
    let app = open_app(config).await?;
    let report = app
        .pipeline
        .handle_message(&UserId::new(user), message, at.unwrap_or_else(Utc::now))
        .await;

    app.pipeline.shutdown().await?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| RecollectError::Internal(format!("failed to encode report: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Run `recollect context`: prints the prompt block for `message`.
pub async fn run_context(
    config: &RecollectConfig,
    user: &str,
    message: &str,
) -> Result<(), RecollectError> {
    let app = open_app(config).await?;
    let context = app.pipeline.context_for(&UserId::new(user), message).await;
    app.pipeline.shutdown().await?;
    println!("{context}");
    Ok(())
}

/// Run `recollect forget`: soft-deletes one record.
pub async fn run_forget(config: &RecollectConfig, id: &str) -> Result<(), RecollectError> {
    let app = open_app(config).await?;
    let id = MemoryId(id.to_string());
    let forgotten = app.store.deactivate(&id).await?;
    app.pipeline.shutdown().await?;
    if forgotten {
        info!(id = %id, "memory forgotten");
        println!("forgot {id}");
        Ok(())
    } else {
        Err(RecollectError::Internal(format!("no active memory with id {id}")))
    }
}

/// Run `recollect health`: prints the pipeline health; unhealthy is an error.
pub async fn run_health(config: &RecollectConfig) -> Result<(), RecollectError> {
    let app = open_app(config).await?;
    let health = app.pipeline.health().await;
    app.pipeline.shutdown().await?;
    println!("{health}");
    match health {
        HealthStatus::Unhealthy(reason) => Err(RecollectError::Internal(reason)),
        HealthStatus::Healthy | HealthStatus::Degraded(_) => Ok(()),
    }
}

/// Run `recollect config`: prints the effective configuration as TOML.
pub fn run_config(config: &RecollectConfig) -> Result<(), RecollectError> {
    println!("{}", render_config(config)?);
    Ok(())
}

/// Effective configuration as TOML, with the API key masked.
pub fn render_config(config: &RecollectConfig) -> Result<String, RecollectError> {
    let mut shown = config.clone();
    if shown.embedding.api_key.is_some() {
        shown.embedding.api_key = Some("********".to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| RecollectError::Internal(format!("failed to render configuration: {e}")))
}

/// Initialize the tracing subscriber. Logs go to stderr so command output
/// on stdout stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recollect={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_masks_api_key() {
        let mut config = RecollectConfig::default();
        config.embedding.api_key = Some("secret-key".to_string());

        let rendered = render_config(&config).unwrap();
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("********"));
        assert!(rendered.contains("[dedup]"));
    }

    #[tokio::test]
    async fn forget_unknown_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecollectConfig::default();
        config.storage.database_path = dir.path().join("m.db").display().to_string();

        let err = run_forget(&config, "missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn fresh_database_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecollectConfig::default();
        config.storage.database_path = dir.path().join("m.db").display().to_string();

        let app = open_app(&config).await.unwrap();
        assert_eq!(app.pipeline.health().await, HealthStatus::Healthy);
        app.pipeline.shutdown().await.unwrap();
        assert!(run_health(&config).await.is_ok());
    }

    #[tokio::test]
    async fn disabled_provider_builds_without_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecollectConfig::default();
        config.storage.database_path = dir.path().join("m.db").display().to_string();

        let app = open_app(&config).await.unwrap();
        let report = app
            .pipeline
            .handle_message(&UserId::new("u"), "I like hiking on weekends", Utc::now())
            .await;
        assert!(report.outcome.is_some());
        assert_eq!(app.store.count_active(&UserId::new("u")).await.unwrap(), 1);
    }
}
