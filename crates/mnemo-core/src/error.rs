// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory engine.

use thiserror::Error;

/// The primary error type used across all Mnemo adapters and engine operations.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Missing or malformed caller input, rejected before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedding provider failures (network, quota, timeout, unexpected response shape).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Record store I/O failures (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Index I/O or query-construction failures.
    #[error("index error: {message}")]
    Index {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation on an id that does not exist.
    #[error("memory not found: {id}")]
    NotFound { id: String },

    /// Configuration errors (invalid values, missing collaborators).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Shorthand for an index error without an underlying source.
    pub fn index(message: impl Into<String>) -> Self {
        MnemoError::Index {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an embedding error without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        MnemoError::Embedding {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for [`MnemoError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, MnemoError::NotFound { .. })
    }
}
