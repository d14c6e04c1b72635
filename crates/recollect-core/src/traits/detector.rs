// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory-worthiness detector trait.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Detection;

/// Decides whether a message carries something worth remembering.
///
/// This gate runs before deduplication; the memory cache itself never
/// decides what is memorable, only whether a memorable item is new.
#[async_trait]
pub trait MemoryDetector: PluginAdapter {
    async fn detect(&self, message: &str) -> Result<Detection, RecollectError>;
}
