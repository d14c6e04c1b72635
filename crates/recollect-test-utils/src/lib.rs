// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for recollect tests.
//!
//! Deterministic stand-ins for the external collaborators, so the
//! deduplication subsystem can be exercised without a network or a database.
//!
//! # Components
//!
//! - [`MockEmbedder`] - deterministic dense embeddings with call counting,
//!   failure and delay injection
//! - [`InMemoryStore`] - memory store with mutation counting, failure and
//!   delay injection
//! - [`fixtures`] - ready-made memory records

pub mod fixtures;
pub mod memory_store;
pub mod mock_embedder;

pub use memory_store::InMemoryStore;
pub use mock_embedder::MockEmbedder;
