// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic index: brute-force cosine similarity over stored embeddings.

use async_trait::async_trait;
use tracing::debug;

use mnemo_core::types::{blob_to_vec, vec_to_blob};
use mnemo_core::{
    AdapterType, HealthStatus, IndexAdapter, IndexEntry, IndexHit, IndexQuery, IndexStrategy,
    MnemoError, PluginAdapter,
};

use crate::index::database::IndexDatabase;
use crate::types::cosine_similarity;

/// Vector nearest-neighbor index.
///
/// Every entry carries an embedding of one fixed length, recorded with the
/// first upsert. Queries score tag-filtered entries by cosine similarity,
/// highest first, ties in insertion order. No similarity floor is applied.
pub struct SemanticIndex {
    db: IndexDatabase,
}

impl SemanticIndex {
    pub fn new(db: IndexDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SemanticIndex {
    fn name(&self) -> &str {
        "cosine-semantic"
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
impl IndexAdapter for SemanticIndex {
    fn strategy(&self) -> IndexStrategy {
        IndexStrategy::Semantic
    }

    async fn upsert(&self, entry: IndexEntry) -> Result<(), MnemoError> {
        let embedding = entry.embedding.ok_or_else(|| {
            MnemoError::index(format!("semantic entry {} has no embedding", entry.id))
        })?;
        if embedding.is_empty() {
            return Err(MnemoError::index(format!(
                "semantic entry {} has an empty embedding",
                entry.id
            )));
        }

        let id = entry.id.clone();
        let dims = embedding.len();
        self.db
            .write_entry(
                entry.id,
                entry.tags,
                None,
                Some(vec_to_blob(&embedding)),
                Some(dims),
            )
            .await?;
        debug!(id = %id, dims, "semantic entry indexed");
        Ok(())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, MnemoError> {
        let Some(vector) = &query.vector else {
            if query.text.is_some() {
                return Err(MnemoError::index("semantic text query is missing its embedding"));
            }
            return self.db.filtered(&query.tags, query.limit).await;
        };

        if let Some(dims) = self.db.dimensions().await? {
            if dims != vector.len() {
                return Err(MnemoError::index(format!(
                    "query embedding has {} dimensions but the index holds {dims}-dimension vectors",
                    vector.len()
                )));
            }
        }

        let mut hits: Vec<IndexHit> = self
            .db
            .vectors(&query.tags)
            .await?
            .into_iter()
            .map(|(id, blob)| IndexHit {
                score: cosine_similarity(vector, &blob_to_vec(&blob)),
                id,
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit);
        Ok(hits)
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
    use mnemo_core::TextQuery;

    fn entry(id: &str, embedding: Vec<f32>, tags: &[&str]) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            content: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            embedding: Some(embedding),
        }
    }

    fn vector_query(vector: Vec<f32>, tags: &[&str], limit: usize) -> IndexQuery {
        IndexQuery {
            text: Some(TextQuery {
                raw: "q".into(),
                terms: vec!["q".into()],
            }),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            limit,
            vector: Some(vector),
        }
    }

    async fn index() -> SemanticIndex {
        SemanticIndex::new(IndexDatabase::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn ranks_by_cosine_descending() {
        let index = index().await;
        index.upsert(entry("far", vec![0.0, 1.0], &[])).await.unwrap();
        index.upsert(entry("near", vec![1.0, 0.1], &[])).await.unwrap();
        index.upsert(entry("opposite", vec![-1.0, 0.0], &[])).await.unwrap();

        let hits = index.query(&vector_query(vec![1.0, 0.0], &[], 10)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far", "opposite"]);
        assert!(hits[0].score > 0.9);
        assert!((hits[2].score + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn limit_truncates_and_ties_keep_insertion_order() {
        let index = index().await;
        for id in ["a", "b", "c"] {
            index.upsert(entry(id, vec![1.0, 1.0], &[])).await.unwrap();
        }
        let hits = index.query(&vector_query(vec![1.0, 1.0], &[], 2)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn tag_filters_apply_to_vector_queries() {
        let index = index().await;
        index.upsert(entry("1", vec![1.0, 0.0], &["a"])).await.unwrap();
        index.upsert(entry("2", vec![1.0, 0.0], &["b"])).await.unwrap();
        index.upsert(entry("3", vec![0.0, 1.0], &["a", "b"])).await.unwrap();

        let hits = index
            .query(&vector_query(vec![1.0, 0.0], &["a", "b"], 10))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_index_error() {
        let index = index().await;
        index.upsert(entry("1", vec![1.0, 0.0], &[])).await.unwrap();

        let err = index.upsert(entry("2", vec![1.0, 0.0, 0.0], &[])).await.unwrap_err();
        assert!(matches!(err, MnemoError::Index { .. }));

        let err = index
            .query(&vector_query(vec![1.0, 0.0, 0.0], &[], 5))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Index { .. }));
    }

    #[tokio::test]
    async fn entry_without_embedding_is_rejected() {
        let index = index().await;
        let mut missing = entry("1", vec![], &[]);
        missing.embedding = None;
        assert!(matches!(
            index.upsert(missing).await,
            Err(MnemoError::Index { .. })
        ));
    }

    #[tokio::test]
    async fn match_all_without_text() {
        let index = index().await;
        index.upsert(entry("1", vec![1.0], &[])).await.unwrap();
        index.upsert(entry("2", vec![1.0], &[])).await.unwrap();
        let query = IndexQuery {
            text: None,
            tags: vec![],
            limit: 10,
            vector: None,
        };
        let hits = index.query(&query).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score == 1.0));
    }

    #[tokio::test]
    async fn clear_allows_new_dimension() {
        let index = index().await;
        index.upsert(entry("1", vec![1.0, 0.0], &[])).await.unwrap();
        index.clear().await.unwrap();
        index.upsert(entry("1", vec![1.0, 0.0, 0.0], &[])).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
    }
}
