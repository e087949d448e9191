// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo memory engine.
//!
//! This crate provides the error taxonomy, the shared domain types and the
//! adapter traits that the record store, the index strategies and the
//! embedding providers implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MnemoError;
pub use types::{
    AdapterType, HealthStatus, IndexEntry, IndexHit, IndexQuery, IndexStrategy, MemoryKind,
    MemoryRecord, TextQuery,
};

pub use traits::{EmbeddingAdapter, IndexAdapter, PluginAdapter};
