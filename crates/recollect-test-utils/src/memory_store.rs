// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory memory store adapter with mutation counting and fault injection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use recollect_core::{
    AdapterType, HealthStatus, MemoryId, MemoryRecord, MemoryStoreAdapter, PluginAdapter,
    RecollectError, UserId,
};

#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<MemoryRecord>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    merges: AtomicUsize,
    retrieves: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    shutdowns: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing counters.
    pub fn insert(&self, record: MemoryRecord) {
        self.lock().push(record);
    }

    /// Snapshot of every record, inactive ones included.
    pub fn records(&self) -> Vec<MemoryRecord> {
        self.lock().clone()
    }

    pub fn active_for(&self, user: &str) -> Vec<MemoryRecord> {
        self.lock()
            .iter()
            .filter(|r| r.is_active && r.user_id.as_str() == user)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &MemoryId) -> Option<MemoryRecord> {
        self.lock().iter().find(|r| r.id == *id).cloned()
    }

    /// Total create + update + merge calls that succeeded.
    pub fn mutations(&self) -> usize {
        self.creates() + self.updates() + self.merges()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn merges(&self) -> usize {
        self.merges.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieves.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Make every following operation fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleep this long at the start of every operation.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MemoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self) -> Result<(), RecollectError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecollectError::storage(std::io::Error::other(
                "in-memory store unavailable",
            )));
        }
        Ok(())
    }

    fn with_record<T>(
        &self,
        id: &MemoryId,
        f: impl FnOnce(&mut MemoryRecord) -> T,
    ) -> Result<T, RecollectError> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| RecollectError::Internal(format!("memory {id} not found")))?;
        let out = f(record);
        record.updated_at = Utc::now();
        Ok(out)
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MemoryStore
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("failure injected".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), RecollectError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MemoryStoreAdapter for InMemoryStore {
    async fn find_by_semantic_hash(
        &self,
        user: &UserId,
        semantic_hash: &str,
    ) -> Result<Option<MemoryRecord>, RecollectError> {
        self.enter().await?;
        Ok(self
            .lock()
            .iter()
            .find(|r| r.is_active && r.user_id == *user && r.semantic_hash == semantic_hash)
            .cloned())
    }

    async fn find_recent(
        &self,
        user: &UserId,
        hours_window: u32,
    ) -> Result<Vec<MemoryRecord>, RecollectError> {
        self.enter().await?;
        let cutoff = Utc::now() - chrono::Duration::hours(i64::from(hours_window));
        let mut recent: Vec<MemoryRecord> = self
            .lock()
            .iter()
            .filter(|r| r.is_active && r.user_id == *user && r.created_at >= cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recent)
    }

    async fn create(
        &self,
        user: &UserId,
        content: &str,
        semantic_hash: &str,
    ) -> Result<MemoryRecord, RecollectError> {
        self.enter().await?;
        let now = Utc::now();
        let record = MemoryRecord {
            id: MemoryId::generate(),
            user_id: user.clone(),
            content: content.to_string(),
            semantic_hash: semantic_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.lock().push(record.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update(&self, id: &MemoryId, new_content: &str) -> Result<(), RecollectError> {
        self.enter().await?;
        self.with_record(id, |r| r.content = new_content.to_string())?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn merge(&self, id: &MemoryId, additional_content: &str) -> Result<(), RecollectError> {
        self.enter().await?;
        self.with_record(id, |r| {
            if !r
                .content
                .to_lowercase()
                .contains(&additional_content.to_lowercase())
            {
                r.content = format!("{}; {}", r.content, additional_content);
            }
        })?;
        self.merges.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn contextual_retrieve(
        &self,
        user: &UserId,
        message: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RecollectError> {
        self.enter().await?;
        self.retrieves.fetch_add(1, Ordering::SeqCst);
        let query = tokens(message);
        let mut scored: Vec<(usize, MemoryRecord)> = self
            .lock()
            .iter()
            .filter(|r| r.is_active && r.user_id == *user)
            .map(|r| (tokens(&r.content).intersection(&query).count(), r.clone()))
            .filter(|(hits, _)| *hits > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, r)| r).collect())
    }
}
