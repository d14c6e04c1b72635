// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory store adapter trait: persistence of memory records.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MemoryId, MemoryRecord, UserId};

/// Adapter for the persistence backend holding memory records.
///
/// Every query is scoped to one user and only ever returns active records.
#[async_trait]
pub trait MemoryStoreAdapter: PluginAdapter {
    /// Look up the active record of `user` carrying exactly this semantic hash.
    async fn find_by_semantic_hash(
        &self,
        user: &UserId,
        semantic_hash: &str,
    ) -> Result<Option<MemoryRecord>, RecollectError>;

    /// Active records created within the last `hours_window` hours, newest first.
    async fn find_recent(
        &self,
        user: &UserId,
        hours_window: u32,
    ) -> Result<Vec<MemoryRecord>, RecollectError>;

    /// Persist a new active record and return it.
    async fn create(
        &self,
        user: &UserId,
        content: &str,
        semantic_hash: &str,
    ) -> Result<MemoryRecord, RecollectError>;

    /// Replace the content of an existing record.
    async fn update(&self, id: &MemoryId, new_content: &str) -> Result<(), RecollectError>;

    /// Fold additional content into an existing record.
    async fn merge(&self, id: &MemoryId, additional_content: &str) -> Result<(), RecollectError>;

    /// Records relevant to `message`, best first, at most `limit` of them.
    async fn contextual_retrieve(
        &self,
        user: &UserId,
        message: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RecollectError>;
}
