// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index maintainer: a derived, rebuildable search index over the record store.
//!
//! Both strategies share one SQLite schema ([`IndexDatabase`]) and implement
//! [`IndexAdapter`]; which one runs is fixed when the engine is built.

pub mod database;
pub mod lexical;
pub mod semantic;

use std::sync::Arc;

use mnemo_core::{IndexAdapter, IndexStrategy};

pub use database::{
    index_path_for, IndexDatabase, META_DIMENSIONS, META_REBUILDING, META_STRATEGY,
};
pub use lexical::LexicalIndex;
pub use semantic::SemanticIndex;

/// Build the adapter for `strategy` over an opened index database.
pub fn build_index(strategy: IndexStrategy, db: IndexDatabase) -> Arc<dyn IndexAdapter> {
    match strategy {
        IndexStrategy::Lexical => Arc::new(LexicalIndex::new(db)),
        IndexStrategy::Semantic => Arc::new(SemanticIndex::new(db)),
    }
}
