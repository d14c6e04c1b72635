// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the recollect workspace.

use thiserror::Error;

/// The error type returned by every adapter trait and internal operation.
///
/// The deduplication API itself never surfaces this type to its caller;
/// failures are folded into degraded decisions at the top level.
#[derive(Debug, Error)]
pub enum RecollectError {
    /// Configuration errors (invalid values, unknown provider names).
    #[error("configuration error: {0}")]
    Config(String),

    /// Memory store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding provider errors (HTTP failure, malformed response, wrong dimensions).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecollectError {
    /// Build an embedding error without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        RecollectError::Embedding {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap any error as a storage error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        RecollectError::Storage {
            source: Box::new(source),
        }
    }
}
