// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record store: durable keyed storage for memory records.
//!
//! Each operation is a single statement (or single transaction) on the
//! connection thread, so single-key operations never interleave partially.
//! With `synchronous = FULL` a successful `put` or `delete` is on stable
//! storage before it returns.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use mnemo_config::model::StorageConfig;
use mnemo_core::types::{blob_to_vec, vec_to_blob};
use mnemo_core::{AdapterType, HealthStatus, MemoryKind, MemoryRecord, MnemoError, PluginAdapter};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::database::{map_tr_err, Database};

/// Number of records fetched per round trip by [`RecordStore::iterate`].
pub const PAGE_SIZE: usize = 256;

const SELECT_COLUMNS: &str = "seq, id, content, kind, tags, embedding, created_at, updated_at";

/// SQLite-backed record store. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    /// Wrap an already opened (and migrated) database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the store at `config.database_path`.
    pub async fn open(config: &StorageConfig) -> Result<Self, MnemoError> {
        let db = Database::open(&config.database_path, config).await?;
        Ok(Self::new(db))
    }

    /// Open a private in-memory store.
    pub async fn open_in_memory() -> Result<Self, MnemoError> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Write a new record under its id. Fails if the id already exists.
    pub async fn put(&self, record: &MemoryRecord) -> Result<(), MnemoError> {
        let tags = serde_json::to_string(&record.tags).map_err(|e| MnemoError::Storage {
            source: Box::new(e),
        })?;
        let id = record.id.clone();
        let content = record.content.clone();
        let kind = record.kind.as_str();
        let embedding = record.embedding.as_deref().map(vec_to_blob);
        let created_at = record.created_at.clone();
        let updated_at = record.updated_at.clone();

        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO memories (id, content, kind, tags, embedding, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![id, content, kind, tags, embedding, created_at, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(id = %record.id, "record stored");
        Ok(())
    }

    /// Fetch a record by id, or [`MnemoError::NotFound`].
    pub async fn get(&self, id: &str) -> Result<MemoryRecord, MnemoError> {
        self.find(id).await?.ok_or_else(|| MnemoError::NotFound {
            id: id.to_string(),
        })
    }

    /// Fetch a record by id if it exists.
    pub async fn find(&self, id: &str) -> Result<Option<MemoryRecord>, MnemoError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<MemoryRecord>, rusqlite::Error> {
                let sql = format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1");
                let mut stmt = conn.prepare_cached(&sql)?;
                let record = stmt
                    .query_row(params![id], |row| row_to_record(row).map(|(_, r)| r))
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Batch hydration: returns the records for `ids` in the same order,
    /// silently skipping ids that do not exist.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<MemoryRecord>, MnemoError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
                let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM memories WHERE id IN ({})",
                    placeholders.join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let params: Vec<&dyn rusqlite::types::ToSql> =
                    ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
                let mut found: HashMap<String, MemoryRecord> = stmt
                    .query_map(params.as_slice(), |row| {
                        row_to_record(row).map(|(_, r)| (r.id.clone(), r))
                    })?
                    .collect::<Result<_, _>>()?;

                Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete a record, or [`MnemoError::NotFound`] if it does not exist.
    pub async fn delete(&self, id: &str) -> Result<(), MnemoError> {
        let owned = id.to_string();
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute("DELETE FROM memories WHERE id = ?1", params![owned])
            })
            .await
            .map_err(map_tr_err)?;

        if removed == 0 {
            return Err(MnemoError::NotFound { id: id.to_string() });
        }
        debug!(id = %id, "record deleted");
        Ok(())
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize, MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            })
            .await
            .map(|n| n.max(0) as usize)
            .map_err(map_tr_err)
    }

    /// Lazily stream every record in insertion order.
    ///
    /// Consistency is a best-effort consistent subset, not a snapshot: the
    /// highest `seq` is captured on the first poll and records inserted after
    /// that are never yielded. Records deleted while the stream is being
    /// consumed may or may not appear. Each page of [`PAGE_SIZE`] records is
    /// read in one statement and is internally consistent. Every call starts
    /// a fresh iteration.
    pub fn iterate(&self) -> BoxStream<'static, Result<MemoryRecord, MnemoError>> {
        let cursor = Cursor {
            conn: self.db.connection().clone(),
            after: 0,
            high_water: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(cursor, Cursor::advance).boxed()
    }
}

struct Cursor {
    conn: Connection,
    after: i64,
    high_water: Option<i64>,
    buffer: VecDeque<MemoryRecord>,
    exhausted: bool,
}

impl Cursor {
    async fn advance(mut self) -> Result<Option<(MemoryRecord, Cursor)>, MnemoError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some((record, self)));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<(), MnemoError> {
        let high_water = match self.high_water {
            Some(seq) => seq,
            None => {
                let seq = self
                    .conn
                    .call(|conn| -> Result<i64, rusqlite::Error> {
                        conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM memories", [], |row| {
                            row.get(0)
                        })
                    })
                    .await
                    .map_err(map_tr_err)?;
                self.high_water = Some(seq);
                seq
            }
        };

        let after = self.after;
        let page = self
            .conn
            .call(move |conn| -> Result<Vec<(i64, MemoryRecord)>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM memories
                     WHERE seq > ?1 AND seq <= ?2 ORDER BY seq LIMIT ?3"
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt
                    .query_map(params![after, high_water, PAGE_SIZE as i64], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        if page.len() < PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some((seq, _)) = page.last() {
            self.after = *seq;
        }
        self.buffer.extend(page.into_iter().map(|(_, record)| record));
        Ok(())
    }
}

/// Decode one row selected with [`SELECT_COLUMNS`].
fn row_to_record(row: &rusqlite::Row<'_>) -> Result<(i64, MemoryRecord), rusqlite::Error> {
    let seq: i64 = row.get(0)?;
    let kind: String = row.get(3)?;
    let kind = MemoryKind::from_str(&kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let tags: String = row.get(4)?;
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let embedding: Option<Vec<u8>> = row.get(5)?;

    Ok((
        seq,
        MemoryRecord {
            id: row.get(1)?,
            content: row.get(2)?,
            kind,
            tags,
            embedding: embedding.map(|blob| blob_to_vec(&blob)),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        },
    ))
}

#[async_trait]
impl PluginAdapter for RecordStore {
    fn name(&self) -> &str {
        "sqlite-records"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        if self.db.path().is_some() {
            self.db.checkpoint().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn make_record(id: &str, content: &str, tags: &[&str]) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            content: content.to_string(),
            kind: MemoryKind::Fact,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            embedding: None,
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            updated_at: "2026-03-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let mut record = make_record("mem_1", "The capital of France is Paris", &["geography"]);
        record.kind = MemoryKind::Reference;
        record.embedding = Some(vec![0.25, -0.5, 1.0]);
        store.put(&record).await.unwrap();

        let loaded = store.get("mem_1").await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let err = store.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_put_fails_without_overwriting() {
        let store = RecordStore::open_in_memory().await.unwrap();
        store.put(&make_record("dup", "first", &[])).await.unwrap();
        let err = store.put(&make_record("dup", "second", &[])).await.unwrap_err();
        assert!(matches!(err, MnemoError::Storage { .. }));
        assert_eq!(store.get("dup").await.unwrap().content, "first");
    }

    #[tokio::test]
    async fn delete_then_delete_is_not_found() {
        let store = RecordStore::open_in_memory().await.unwrap();
        store.put(&make_record("mem_1", "x", &[])).await.unwrap();
        store.delete("mem_1").await.unwrap();
        assert!(store.delete("mem_1").await.unwrap_err().is_not_found());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_many_preserves_order_and_skips_missing() {
        let store = RecordStore::open_in_memory().await.unwrap();
        for id in ["a", "b", "c"] {
            store.put(&make_record(id, id, &[])).await.unwrap();
        }
        let ids: Vec<String> = ["c", "ghost", "a"].iter().map(|s| s.to_string()).collect();
        let records = store.get_many(&ids).await.unwrap();
        let got: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["c", "a"]);
        assert!(store.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn iterate_spans_multiple_pages_in_insertion_order() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let total = PAGE_SIZE + 7;
        for i in 0..total {
            store
                .put(&make_record(&format!("mem_{i:04}"), "page test", &[]))
                .await
                .unwrap();
        }

        let records: Vec<MemoryRecord> = store.iterate().try_collect().await.unwrap();
        assert_eq!(records.len(), total);
        assert_eq!(records[0].id, "mem_0000");
        assert_eq!(records[total - 1].id, format!("mem_{:04}", total - 1));

        // Restartable: a second call yields the same sequence again.
        let again: Vec<MemoryRecord> = store.iterate().try_collect().await.unwrap();
        assert_eq!(again.len(), total);
    }

    #[tokio::test]
    async fn iterate_ignores_records_added_after_first_poll() {
        let store = RecordStore::open_in_memory().await.unwrap();
        store.put(&make_record("early", "x", &[])).await.unwrap();

        let mut stream = store.iterate();
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first.id, "early");

        store.put(&make_record("late", "y", &[])).await.unwrap();
        assert!(stream.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn iterate_empty_store_yields_nothing() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let records: Vec<MemoryRecord> = store.iterate().try_collect().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("memory.db").to_string_lossy().into_owned(),
            wal_mode: true,
            busy_timeout_ms: 1000,
        };
        {
            let store = RecordStore::open(&config).await.unwrap();
            store.put(&make_record("durable", "kept", &["t"])).await.unwrap();
            store.shutdown().await.unwrap();
        }
        let store = RecordStore::open(&config).await.unwrap();
        assert_eq!(store.get("durable").await.unwrap().tags, vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_puts_to_distinct_ids_all_land() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(&make_record(&format!("c{i}"), "concurrent", &[]))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 32);
    }

    #[tokio::test]
    async fn plugin_adapter_identity_and_health() {
        let store = RecordStore::open_in_memory().await.unwrap();
        assert_eq!(store.name(), "sqlite-records");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
