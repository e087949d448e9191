// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory engine: the one entry point callers use.
//!
//! Writes go record store first, index second. The two are separate SQLite
//! files with no shared transaction, so a failed index step after a
//! successful store write is reported to the caller and repaired by
//! [`MemoryEngine::rebuild_index`], which re-derives the whole index from
//! the record store. [`MemoryEngine::open`] runs that rebuild when the index
//! looks stale.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use mnemo_config::MnemoConfig;
use mnemo_core::types::EmbeddingInput;
use mnemo_core::{
    EmbeddingAdapter, IndexAdapter, IndexEntry, IndexStrategy, MemoryKind, MemoryRecord,
    MnemoError, PluginAdapter,
};
use mnemo_storage::RecordStore;

use crate::id::generate_id;
use crate::index::{build_index, index_path_for, IndexDatabase, META_REBUILDING, META_STRATEGY};
use crate::planner::{normalize_tags, QueryPlanner};
use crate::types::ScoredMemory;

/// Entry counts on both sides of the store/index boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub records: usize,
    pub index_entries: usize,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.records == self.index_entries
    }
}

/// Facade over the record store, the active index and the query planner.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct MemoryEngine {
    store: RecordStore,
    index: Arc<dyn IndexAdapter>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    planner: QueryPlanner,
    dimensions: Option<usize>,
}

impl MemoryEngine {
    /// Assemble an engine from already opened parts.
    ///
    /// The semantic strategy needs an embedding provider; without one this
    /// fails with [`MnemoError::Config`].
    pub fn new(
        store: RecordStore,
        index: Arc<dyn IndexAdapter>,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
    ) -> Result<Self, MnemoError> {
        if index.strategy() == IndexStrategy::Semantic && embedder.is_none() {
            return Err(MnemoError::Config(
                "the semantic index strategy requires an embedding provider".to_string(),
            ));
        }
        Ok(Self {
            store,
            index,
            embedder,
            planner: QueryPlanner::default(),
            dimensions: None,
        })
    }

    /// Open the record store and its index as configured, rebuilding the
    /// index from the store when the two disagree.
    pub async fn open(
        config: &MnemoConfig,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
    ) -> Result<Self, MnemoError> {
        let strategy = config.index.strategy;
        if strategy == IndexStrategy::Semantic && embedder.is_none() {
            return Err(MnemoError::Config(
                "the semantic index strategy requires an embedding provider".to_string(),
            ));
        }

        let store_path = Path::new(&config.storage.database_path);
        let index_path = index_path_for(store_path);
        let store_existed = store_path.exists();
        let index_existed = index_path.exists();

        let store = RecordStore::open(&config.storage).await?;
        let index_db = IndexDatabase::open(&index_path, &config.storage).await?;

        let mut reasons: Vec<String> = Vec::new();
        match (store_existed, index_existed) {
            (true, false) => reasons.push("index file is missing".to_string()),
            (false, true) => reasons.push("record store file is missing".to_string()),
            _ => {}
        }

        match index_db.meta(META_STRATEGY).await? {
            Some(stored) if stored != strategy.to_string() => {
                reasons.push(format!("index was built with the {stored} strategy"));
            }
            None if index_existed => reasons.push("index has no strategy marker".to_string()),
            _ => {}
        }

        if index_db.meta(META_REBUILDING).await?.is_some() {
            reasons.push("a previous rebuild did not finish".to_string());
        }

        let expected_dims = match strategy {
            IndexStrategy::Semantic => config.embedding.dimensions,
            IndexStrategy::Lexical => None,
        };
        if let (Some(expected), Some(stored)) = (expected_dims, index_db.dimensions().await?) {
            if expected != stored {
                reasons.push(format!(
                    "index holds {stored}-dimension vectors, expected {expected}"
                ));
            }
        }

        if config.index.verify_on_open && reasons.is_empty() {
            let records = store.count().await?;
            let entries = index_db.len().await?;
            if records != entries {
                reasons.push(format!(
                    "index has {entries} entries for {records} records"
                ));
            }
        }

        let marker = index_db.clone();
        let index = build_index(strategy, index_db);
        let mut engine = Self::new(store, index, embedder)?;
        engine.dimensions = expected_dims;

        if !reasons.is_empty() {
            warn!(
                reasons = %reasons.join("; "),
                "index is inconsistent with the record store, rebuilding"
            );
            engine.rebuild_index().await?;
        }
        // Only a complete index may claim the configured strategy.
        marker.set_meta(META_STRATEGY, strategy.to_string()).await?;

        info!(
            path = %store_path.display(),
            strategy = %strategy,
            "memory engine opened"
        );
        Ok(engine)
    }

    /// A fully in-memory engine. Nothing survives the process.
    pub async fn open_in_memory(
        strategy: IndexStrategy,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
    ) -> Result<Self, MnemoError> {
        let store = RecordStore::open_in_memory().await?;
        let index_db = IndexDatabase::open_in_memory().await?;
        index_db.set_meta(META_STRATEGY, strategy.to_string()).await?;
        Self::new(store, build_index(strategy, index_db), embedder)
    }

    /// Override the result ceiling applied to every search.
    pub fn with_planner(mut self, planner: QueryPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn strategy(&self) -> IndexStrategy {
        self.index.strategy()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn index(&self) -> &Arc<dyn IndexAdapter> {
        &self.index
    }

    pub fn embedder(&self) -> Option<&Arc<dyn EmbeddingAdapter>> {
        self.embedder.as_ref()
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Store a new memory and index it. Returns the new id.
    ///
    /// With the semantic strategy the content is embedded first; if that
    /// fails nothing is written. If indexing fails after the record was
    /// stored the error says so, and a rebuild makes the record searchable.
    pub async fn add(
        &self,
        content: &str,
        kind: MemoryKind,
        tags: &[String],
    ) -> Result<String, MnemoError> {
        if content.trim().is_empty() {
            return Err(MnemoError::Validation(
                "content must not be empty".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut record = MemoryRecord {
            id: generate_id(),
            content: content.to_string(),
            kind,
            tags: normalize_tags(tags),
            embedding: None,
            created_at: now.clone(),
            updated_at: now,
        };

        if self.strategy() == IndexStrategy::Semantic {
            record.embedding = Some(self.embed_one(&record.content).await?);
        }

        self.store.put(&record).await?;

        if let Err(e) = self.index.upsert(IndexEntry::from_record(&record)).await {
            error!(id = %record.id, error = %e, "memory stored but not indexed");
            return Err(MnemoError::Index {
                message: format!(
                    "memory {} was stored but not indexed; rebuild will recover it: {e}",
                    record.id
                ),
                source: Some(Box::new(e)),
            });
        }

        debug!(id = %record.id, kind = %record.kind, tags = record.tags.len(), "memory added");
        Ok(record.id)
    }

    /// Ranked search. Empty text with no tags returns up to `limit` records
    /// in insertion order.
    ///
    /// Index hits whose record is gone are skipped, so the result can be
    /// shorter than the number of hits.
    pub async fn search(
        &self,
        text: &str,
        tags: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<ScoredMemory>, MnemoError> {
        let mut query = self.planner.plan(text, tags, limit)?;
        if self.strategy() == IndexStrategy::Semantic {
            if let Some(text) = &query.text {
                query.vector = Some(self.embed_one(&text.raw).await?);
            }
        }

        let hits = self.index.query(&query).await?;
        if hits.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let mut records: HashMap<String, MemoryRecord> = self
            .store
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match records.remove(&hit.id) {
                Some(record) => results.push(ScoredMemory {
                    record,
                    score: hit.score,
                }),
                None => warn!(id = %hit.id, "skipping index entry with no stored record"),
            }
        }

        debug!(count = results.len(), "search completed");
        Ok(results)
    }

    /// Remove a memory from the store, then from the index.
    ///
    /// An unknown id is [`MnemoError::NotFound`] and leaves the index alone.
    pub async fn delete(&self, id: &str) -> Result<(), MnemoError> {
        if id.trim().is_empty() {
            return Err(MnemoError::Validation("id must not be empty".to_string()));
        }

        self.store.delete(id).await?;

        match self.index.remove(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(id = %id, "deleted memory had no index entry");
            }
            Err(e) => {
                error!(id = %id, error = %e, "memory deleted from store but still indexed");
                return Err(e);
            }
        }

        debug!(id = %id, "memory deleted");
        Ok(())
    }

    /// Exact lookup by id.
    pub async fn get(&self, id: &str) -> Result<MemoryRecord, MnemoError> {
        self.store.get(id).await
    }

    /// Number of stored memories.
    pub async fn count(&self) -> Result<usize, MnemoError> {
        self.store.count().await
    }

    /// Compare record and index entry counts.
    pub async fn check_consistency(&self) -> Result<ConsistencyReport, MnemoError> {
        Ok(ConsistencyReport {
            records: self.store.count().await?,
            index_entries: self.index.len().await?,
        })
    }

    /// Drop the index and re-derive it from the record store.
    ///
    /// The index stays marked incomplete until the last entry is written, so
    /// a rebuild that fails partway is retried by the next [`MemoryEngine::open`].
    /// Semantic rebuilds reuse stored embeddings. Records with no vector, or
    /// a vector of the wrong length, are embedded again. Returns the number
    /// of entries written.
    pub async fn rebuild_index(&self) -> Result<usize, MnemoError> {
        self.index.clear().await?;

        let semantic = self.strategy() == IndexStrategy::Semantic;
        let mut dims = self.dimensions;
        let mut reembedded = 0usize;
        let mut count = 0usize;

        let mut records = self.store.iterate();
        while let Some(record) = records.next().await {
            let mut record = record?;
            if semantic {
                let usable = match (&record.embedding, dims) {
                    (Some(v), Some(d)) => v.len() == d,
                    (Some(v), None) => !v.is_empty(),
                    (None, _) => false,
                };
                if !usable {
                    record.embedding = Some(self.embed_one(&record.content).await?);
                    reembedded += 1;
                }
                if dims.is_none() {
                    dims = record.embedding.as_ref().map(Vec::len);
                }
            }
            self.index.upsert(IndexEntry::from_record(&record)).await?;
            count += 1;
        }
        self.index.finish_rebuild().await?;

        info!(
            count,
            reembedded,
            strategy = %self.strategy(),
            "index rebuilt from record store"
        );
        Ok(count)
    }

    /// Checkpoint both databases and release the embedding provider.
    pub async fn close(&self) -> Result<(), MnemoError> {
        self.store.shutdown().await?;
        self.index.shutdown().await?;
        if let Some(embedder) = &self.embedder {
            embedder.shutdown().await?;
        }
        info!("memory engine closed");
        Ok(())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            MnemoError::Config("no embedding provider configured".to_string())
        })?;
        let output = embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MnemoError::embedding("embedding provider returned no vector"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::MockEmbedder;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn semantic_without_embedder_is_config_error() {
        let result = MemoryEngine::open_in_memory(IndexStrategy::Semantic, None).await;
        assert!(matches!(result, Err(MnemoError::Config(_))));
    }

    #[tokio::test]
    async fn blank_content_is_rejected_before_io() {
        let engine = MemoryEngine::open_in_memory(IndexStrategy::Lexical, None)
            .await
            .unwrap();
        assert!(matches!(
            engine.add("   ", MemoryKind::Fact, &[]).await,
            Err(MnemoError::Validation(_))
        ));
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tags_are_stored_normalized() {
        let engine = MemoryEngine::open_in_memory(IndexStrategy::Lexical, None)
            .await
            .unwrap();
        let id = engine
            .add("x", MemoryKind::Reference, &tags(&["b", " a ", "b", ""]))
            .await
            .unwrap();
        let record = engine.get(&id).await.unwrap();
        assert_eq!(record.tags, tags(&["a", "b"]));
        assert_eq!(record.kind, MemoryKind::Reference);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn semantic_add_stores_the_embedding() {
        let embedder = Arc::new(MockEmbedder::new());
        let engine = MemoryEngine::open_in_memory(
            IndexStrategy::Semantic,
            Some(embedder.clone() as Arc<dyn EmbeddingAdapter>),
        )
        .await
        .unwrap();
        let id = engine.add("hello world", MemoryKind::Fact, &[]).await.unwrap();
        let record = engine.get(&id).await.unwrap();
        assert_eq!(record.embedding.map(|v| v.len()), Some(embedder.dimensions()));
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn semantic_match_all_does_not_embed() {
        let embedder = Arc::new(MockEmbedder::new());
        let engine = MemoryEngine::open_in_memory(
            IndexStrategy::Semantic,
            Some(embedder.clone() as Arc<dyn EmbeddingAdapter>),
        )
        .await
        .unwrap();
        engine.add("one", MemoryKind::Fact, &[]).await.unwrap();
        let before = embedder.calls();
        let results = engine.search("", &[], None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(embedder.calls(), before);
    }

    #[tokio::test]
    async fn consistency_report_counts_both_sides() {
        let engine = MemoryEngine::open_in_memory(IndexStrategy::Lexical, None)
            .await
            .unwrap();
        engine.add("a", MemoryKind::Fact, &[]).await.unwrap();
        let report = engine.check_consistency().await.unwrap();
        assert_eq!(report.records, 1);
        assert!(report.is_consistent());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn dangling_entry_is_logged_and_skipped() {
        let engine = MemoryEngine::open_in_memory(IndexStrategy::Lexical, None)
            .await
            .unwrap();
        let id = engine.add("stale", MemoryKind::Fact, &[]).await.unwrap();
        engine.store().delete(&id).await.unwrap();

        assert!(engine.search("stale", &[], None).await.unwrap().is_empty());
        assert!(logs_contain("skipping index entry with no stored record"));
    }
}
