// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory persistence and retrieval engine.
//!
//! ## Architecture
//!
//! - **MemoryEngine**: add/search/delete facade over the record store and the index
//! - **LexicalIndex**: FTS5 inverted index with BM25 ranking and tag filters
//! - **SemanticIndex**: brute-force cosine similarity over stored embeddings
//! - **QueryPlanner**: normalizes text, tags and limits into one index query
//! - **HttpEmbedder**: OpenAI-compatible embedding provider
//! - **Types**: ScoredMemory, cosine similarity

pub mod embedder;
pub mod engine;
pub mod id;
pub mod index;
pub mod planner;
pub mod types;

pub use embedder::HttpEmbedder;
pub use engine::{ConsistencyReport, MemoryEngine};
pub use id::generate_id;
pub use index::{build_index, index_path_for, IndexDatabase, LexicalIndex, SemanticIndex};
pub use planner::QueryPlanner;
pub use types::*;
