// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the memory cache.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod detector;
pub mod embedding;
pub mod store;

pub use adapter::PluginAdapter;
pub use detector::MemoryDetector;
pub use embedding::EmbeddingAdapter;
pub use store::MemoryStoreAdapter;
