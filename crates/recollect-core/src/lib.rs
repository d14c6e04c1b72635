// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the recollect memory cache.
//!
//! Holds the error type, the domain types shared across crates, and the
//! adapter traits for the external collaborators: the embedding provider,
//! the memory store, and the memory-worthiness detector. Everything that
//! talks to those collaborators depends only on these traits.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RecollectError;
pub use types::{
    AdapterType, Detection, EmbeddingInput, EmbeddingOutput, HealthStatus, MemoryId,
    MemoryRecord, UserId,
};

pub use traits::{EmbeddingAdapter, MemoryDetector, MemoryStoreAdapter, PluginAdapter};
