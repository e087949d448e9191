// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexical index: FTS5 over content, exact-match tags, BM25 ranking.

use async_trait::async_trait;
use tracing::debug;

use mnemo_core::{
    AdapterType, HealthStatus, IndexAdapter, IndexEntry, IndexHit, IndexQuery, IndexStrategy,
    MnemoError, PluginAdapter,
};

use crate::index::database::IndexDatabase;
use crate::planner::fts_expression;

/// Inverted index over content tokens and tags.
///
/// Text queries are any-term FTS5 matches ranked by BM25. Tags narrow the
/// result set and never contribute to the score. Without text every entry
/// passing the tag filter qualifies, in insertion order.
pub struct LexicalIndex {
    db: IndexDatabase,
}

impl LexicalIndex {
    pub fn new(db: IndexDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for LexicalIndex {
    fn name(&self) -> &str {
        "fts5-lexical"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Index
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        self.db.ping().await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl IndexAdapter for LexicalIndex {
    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::Lexical
    }

    async fn upsert(&self, entry: IndexEntry) -> Result<(), MnemoError> {
        let id = entry.id.clone();
        self.db
            .write_entry(entry.id, entry.tags, Some(entry.content), None, None)
            .await?;
        debug!(id = %id, "lexical entry indexed");
        Ok(())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, MnemoError> {
        match &query.text {
            None => self.db.filtered(&query.tags, query.limit).await,
            Some(text) => match fts_expression(&text.terms) {
                Some(expression) => {
                    self.db
                        .full_text(expression, &query.tags, query.limit)
                        .await
                }
                // Text with no searchable terms matches nothing.
                None => Ok(vec![]),
            },
        }
    }

    async fn remove(&self, id: &str) -> Result<(), MnemoError> {
        self.db.remove(id).await
    }

    async fn len(&self) -> Result<usize, MnemoError> {
        self.db.len().await
    }

    async fn clear(&self) -> Result<(), MnemoError> {
        self.db.clear().await
    }

    async fn finish_rebuild(&self) -> Result<(), MnemoError> {
        self.db.finish_rebuild().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::QueryPlanner;

    fn entry(id: &str, content: &str, tags: &[&str]) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            content: content.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            embedding: None,
        }
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    async fn index() -> LexicalIndex {
        LexicalIndex::new(IndexDatabase::open_in_memory().await.unwrap())
    }

    fn ids(hits: &[IndexHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[tokio::test]
    async fn term_overlap_ranks_paris_first() {
        let index = index().await;
        index
            .upsert(entry("paris", "The capital of France is Paris", &["geography"]))
            .await
            .unwrap();
        index
            .upsert(entry("water", "Water boils at 100C", &["physics"]))
            .await
            .unwrap();

        let query = QueryPlanner::default()
            .plan("capital of France", &[], Some(1))
            .unwrap();
        let hits = index.query(&query).await.unwrap();
        assert_eq!(ids(&hits), vec!["paris"]);
        assert!(hits[0].score > 0.0);
    }

    #[tokio::test]
    async fn tags_are_conjunctive() {
        let index = index().await;
        index.upsert(entry("1", "one", &["a"])).await.unwrap();
        index.upsert(entry("2", "two", &["b"])).await.unwrap();
        index.upsert(entry("3", "three", &["a", "b"])).await.unwrap();

        let query = QueryPlanner::default()
            .plan("", &tags(&["a", "b"]), None)
            .unwrap();
        assert_eq!(ids(&index.query(&query).await.unwrap()), vec!["3"]);
    }

    #[tokio::test]
    async fn text_and_tags_must_both_match() {
        let index = index().await;
        index.upsert(entry("1", "rust borrow checker", &["lang"])).await.unwrap();
        index.upsert(entry("2", "rust on iron", &["chemistry"])).await.unwrap();

        let query = QueryPlanner::default()
            .plan("rust", &tags(&["chemistry"]), None)
            .unwrap();
        assert_eq!(ids(&index.query(&query).await.unwrap()), vec!["2"]);
    }

    #[tokio::test]
    async fn match_all_in_insertion_order_with_limit() {
        let index = index().await;
        for i in 0..5 {
            index.upsert(entry(&i.to_string(), "x", &[])).await.unwrap();
        }
        let query = QueryPlanner::default().plan("", &[], Some(3)).unwrap();
        let hits = index.query(&query).await.unwrap();
        assert_eq!(ids(&hits), vec!["0", "1", "2"]);
        assert!(hits.iter().all(|h| h.score == 1.0));
    }

    #[tokio::test]
    async fn diacritics_and_case_fold() {
        let index = index().await;
        index.upsert(entry("cafe", "Le Café de Flore", &[])).await.unwrap();
        let query = QueryPlanner::default().plan("CAFE", &[], None).unwrap();
        assert_eq!(ids(&index.query(&query).await.unwrap()), vec!["cafe"]);
    }

    #[tokio::test]
    async fn punctuation_only_query_matches_nothing() {
        let index = index().await;
        index.upsert(entry("1", "anything", &[])).await.unwrap();
        let query = QueryPlanner::default().plan("?!*", &[], None).unwrap();
        assert!(index.query(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fts_syntax_in_query_text_is_inert() {
        let index = index().await;
        index.upsert(entry("1", "near and or not", &[])).await.unwrap();
        let query = QueryPlanner::default()
            .plan("NEAR(\"and\" OR) NOT*", &[], None)
            .unwrap();
        assert_eq!(ids(&index.query(&query).await.unwrap()), vec!["1"]);
    }

    #[tokio::test]
    async fn remove_then_remove_is_not_found() {
        let index = index().await;
        index.upsert(entry("1", "gone soon", &["t"])).await.unwrap();
        index.remove("1").await.unwrap();
        assert!(index.remove("1").await.unwrap_err().is_not_found());

        let query = QueryPlanner::default().plan("gone", &[], None).unwrap();
        assert!(index.query(&query).await.unwrap().is_empty());
        assert_eq!(index.len().await.unwrap(), 0);
    }
}
