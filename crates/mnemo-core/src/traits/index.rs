// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index adapter trait shared by the lexical and semantic strategies.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{IndexEntry, IndexHit, IndexQuery, IndexStrategy};

/// A derived, queryable index over the record store's key space.
///
/// Both strategies expose the same shape so the engine never needs to know
/// which one is active beyond [`IndexAdapter::strategy`].
#[async_trait]
pub trait IndexAdapter: PluginAdapter {
    /// The strategy implemented by this adapter.
    fn strategy(&self) -> IndexStrategy;

    /// Inserts the entry, replacing any existing entry with the same id.
    async fn upsert(&self, entry: IndexEntry) -> Result<(), MnemoError>;

    /// Runs a composite query. Results are ranked, at most `query.limit` long.
    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, MnemoError>;

    /// Removes the entry for `id`, or returns [`MnemoError::NotFound`].
    async fn remove(&self, id: &str) -> Result<(), MnemoError>;

    /// Number of entries currently indexed.
    async fn len(&self) -> Result<usize, MnemoError>;

    /// Drops every entry and marks the index incomplete (used before a rebuild).
    async fn clear(&self) -> Result<(), MnemoError>;

    /// Marks a rebuild started by [`IndexAdapter::clear`] as complete.
    async fn finish_rebuild(&self) -> Result<(), MnemoError>;
}
