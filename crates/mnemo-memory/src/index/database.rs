// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The index artifact: a second SQLite file next to the record store.
//!
//! Holds one row per indexed record in `index_entries`, its tags in
//! `index_tags`, its searchable text in the `index_fts` FTS5 table (rowid =
//! entry seq) and strategy metadata in `index_meta`. Everything in here can be
//! rebuilt from the record store.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mnemo_config::model::StorageConfig;
use mnemo_core::{IndexHit, MnemoError};
use mnemo_storage::Database;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// `index_meta` key holding the strategy that built the index.
pub const META_STRATEGY: &str = "strategy";

/// `index_meta` key holding the vector length of a semantic index.
pub const META_DIMENSIONS: &str = "dimensions";

/// `index_meta` key present from [`IndexDatabase::clear`] until
/// [`IndexDatabase::finish_rebuild`]. An index carrying it is incomplete.
pub const META_REBUILDING: &str = "rebuilding";

/// Derive the index artifact path from the record store path: `<path>.index`.
pub fn index_path_for(database_path: &Path) -> PathBuf {
    let mut path: OsString = database_path.as_os_str().to_os_string();
    path.push(".index");
    PathBuf::from(path)
}

/// Convert tokio-rusqlite errors on the index file into [`MnemoError::Index`].
pub(crate) fn map_index_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MnemoError {
    MnemoError::Index {
        message: format!("index database error: {e}"),
        source: Some(Box::new(e)),
    }
}

fn reclassify(e: MnemoError) -> MnemoError {
    match e {
        MnemoError::Storage { source } => MnemoError::Index {
            message: format!("failed to open index: {source}"),
            source: Some(source),
        },
        other => other,
    }
}

fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), MnemoError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| MnemoError::Index {
            message: format!("index migration failed: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(())
}

/// Appends a conjunctive tag filter on `e.id` and its parameters.
fn tag_filter(tags: &[String], params: &mut Vec<Value>) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let placeholders = vec!["?"; tags.len()].join(", ");
    params.extend(tags.iter().cloned().map(Value::Text));
    params.push(Value::Integer(tags.len() as i64));
    format!(
        " AND e.id IN (SELECT id FROM index_tags WHERE tag IN ({placeholders}) \
         GROUP BY id HAVING COUNT(DISTINCT tag) = ?)"
    )
}

/// Shared handle to the index file, used by both strategies.
#[derive(Clone)]
pub struct IndexDatabase {
    db: Database,
}

impl IndexDatabase {
    /// Open (creating if needed) the index file at `path`.
    pub async fn open(path: &Path, storage: &StorageConfig) -> Result<Self, MnemoError> {
        let db = Database::open_with(
            path,
            storage.wal_mode,
            storage.busy_timeout_ms,
            run_migrations,
        )
        .await
        .map_err(reclassify)?;
        Ok(Self { db })
    }

    /// Open a private in-memory index.
    pub async fn open_in_memory() -> Result<Self, MnemoError> {
        let db = Database::open_in_memory_with(run_migrations)
            .await
            .map_err(reclassify)?;
        Ok(Self { db })
    }

    /// File path, or `None` for in-memory indexes.
    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    pub async fn meta(&self, key: &'static str) -> Result<Option<String>, MnemoError> {
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM index_meta WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_index_err)
    }

    pub async fn set_meta(&self, key: &'static str, value: String) -> Result<(), MnemoError> {
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_index_err)
    }

    /// Recorded vector length, if a semantic entry has been written.
    pub async fn dimensions(&self) -> Result<Option<usize>, MnemoError> {
        Ok(self
            .meta(META_DIMENSIONS)
            .await?
            .and_then(|v| v.parse::<usize>().ok()))
    }

    /// Insert or replace one entry in a single transaction.
    ///
    /// `content` goes into the full-text table when present. When
    /// `dimensions` is given it is recorded on first write and must match
    /// afterwards; on mismatch nothing is written.
    pub(crate) async fn write_entry(
        &self,
        id: String,
        tags: Vec<String>,
        content: Option<String>,
        embedding: Option<Vec<u8>>,
        dimensions: Option<usize>,
    ) -> Result<(), MnemoError> {
        let written = self
            .db
            .connection()
            .call(move |conn| -> Result<Result<(), usize>, rusqlite::Error> {
                let tx = conn.transaction()?;

                if let Some(dims) = dimensions {
                    tx.execute(
                        "INSERT OR IGNORE INTO index_meta (key, value) VALUES (?1, ?2)",
                        params![META_DIMENSIONS, dims.to_string()],
                    )?;
                    let recorded: String = tx.query_row(
                        "SELECT value FROM index_meta WHERE key = ?1",
                        params![META_DIMENSIONS],
                        |row| row.get(0),
                    )?;
                    let recorded = recorded.parse::<usize>().unwrap_or_default();
                    if recorded != dims {
                        return Ok(Err(recorded));
                    }
                }

                let previous: Option<i64> = tx
                    .query_row(
                        "SELECT seq FROM index_entries WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(seq) = previous {
                    tx.execute("DELETE FROM index_fts WHERE rowid = ?1", params![seq])?;
                    tx.execute("DELETE FROM index_entries WHERE seq = ?1", params![seq])?;
                }
                tx.execute("DELETE FROM index_tags WHERE id = ?1", params![id])?;

                tx.execute(
                    "INSERT INTO index_entries (id, embedding) VALUES (?1, ?2)",
                    params![id, embedding],
                )?;
                let seq = tx.last_insert_rowid();
                if let Some(content) = content {
                    tx.execute(
                        "INSERT INTO index_fts (rowid, content) VALUES (?1, ?2)",
                        params![seq, content],
                    )?;
                }
                {
                    let mut stmt =
                        tx.prepare_cached("INSERT OR IGNORE INTO index_tags (id, tag) VALUES (?1, ?2)")?;
                    for tag in &tags {
                        stmt.execute(params![id, tag])?;
                    }
                }

                tx.commit()?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_index_err)?;

        written.map_err(|recorded| {
            MnemoError::index(format!(
                "embedding has {} dimensions but the index holds {recorded}-dimension vectors",
                dimensions.unwrap_or_default()
            ))
        })
    }

    /// Remove the entry for `id`, or [`MnemoError::NotFound`].
    pub async fn remove(&self, id: &str) -> Result<(), MnemoError> {
        let owned = id.to_string();
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                let seq: Option<i64> = tx
                    .query_row(
                        "SELECT seq FROM index_entries WHERE id = ?1",
                        params![owned],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(seq) = seq else {
                    return Ok(false);
                };
                tx.execute("DELETE FROM index_fts WHERE rowid = ?1", params![seq])?;
                tx.execute("DELETE FROM index_entries WHERE seq = ?1", params![seq])?;
                tx.execute("DELETE FROM index_tags WHERE id = ?1", params![owned])?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_index_err)?;

        if removed {
            Ok(())
        } else {
            Err(MnemoError::NotFound { id: id.to_string() })
        }
    }

    pub async fn len(&self) -> Result<usize, MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM index_entries", [], |row| row.get(0))
            })
            .await
            .map(|n| n.max(0) as usize)
            .map_err(map_index_err)
    }

    /// Drop every entry and the recorded dimension, and mark the index as
    /// mid-rebuild. The strategy marker stays.
    pub async fn clear(&self) -> Result<(), MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute_batch(
                    "DELETE FROM index_fts;
                     DELETE FROM index_entries;
                     DELETE FROM index_tags;",
                )?;
                tx.execute("DELETE FROM index_meta WHERE key = ?1", params![META_DIMENSIONS])?;
                tx.execute(
                    "INSERT INTO index_meta (key, value) VALUES (?1, '1')
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![META_REBUILDING],
                )?;
                tx.commit()
            })
            .await
            .map_err(map_index_err)
    }

    /// Clear the mid-rebuild mark set by [`IndexDatabase::clear`].
    pub async fn finish_rebuild(&self) -> Result<(), MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM index_meta WHERE key = ?1", params![META_REBUILDING])?;
                Ok(())
            })
            .await
            .map_err(map_index_err)
    }

    /// Entries passing the tag filter in insertion order, each scored `1.0`.
    pub(crate) async fn filtered(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<IndexHit>, MnemoError> {
        let mut values = Vec::new();
        let filter = tag_filter(tags, &mut values);
        values.push(Value::Integer(limit as i64));
        let sql = format!("SELECT e.id FROM index_entries e WHERE 1 = 1{filter} ORDER BY e.seq LIMIT ?");

        self.db
            .connection()
            .call(move |conn| -> Result<Vec<IndexHit>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let hits = stmt
                    .query_map(params_from_iter(values), |row| {
                        Ok(IndexHit {
                            id: row.get(0)?,
                            score: 1.0,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(hits)
            })
            .await
            .map_err(map_index_err)
    }

    /// BM25-ranked full-text matches passing the tag filter.
    ///
    /// Scores are negated BM25, so higher is better. Ties keep insertion order.
    pub(crate) async fn full_text(
        &self,
        expression: String,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<IndexHit>, MnemoError> {
        let mut values = vec![Value::Text(expression)];
        let filter = tag_filter(tags, &mut values);
        values.push(Value::Integer(limit as i64));
        let sql = format!(
            "SELECT e.id, -bm25(index_fts) AS score
             FROM index_fts JOIN index_entries e ON e.seq = index_fts.rowid
             WHERE index_fts MATCH ?{filter}
             ORDER BY score DESC, e.seq
             LIMIT ?"
        );

        self.db
            .connection()
            .call(move |conn| -> Result<Vec<IndexHit>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let hits = stmt
                    .query_map(params_from_iter(values), |row| {
                        let score: f64 = row.get(1)?;
                        Ok(IndexHit {
                            id: row.get(0)?,
                            score: score as f32,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(hits)
            })
            .await
            .map_err(map_index_err)
    }

    /// `(id, embedding)` for every entry with a vector passing the tag filter,
    /// in insertion order.
    pub(crate) async fn vectors(&self, tags: &[String]) -> Result<Vec<(String, Vec<u8>)>, MnemoError> {
        let mut values = Vec::new();
        let filter = tag_filter(tags, &mut values);
        let sql = format!(
            "SELECT e.id, e.embedding FROM index_entries e
             WHERE e.embedding IS NOT NULL{filter} ORDER BY e.seq"
        );

        self.db
            .connection()
            .call(move |conn| -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows: Vec<(String, Vec<u8>)> = stmt
                    .query_map(params_from_iter(values), |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_index_err)
    }

    pub async fn ping(&self) -> Result<(), MnemoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_index_err)
    }

    /// WAL checkpoint for file-backed indexes; no-op in memory.
    pub async fn checkpoint(&self) -> Result<(), MnemoError> {
        if self.db.path().is_none() {
            return Ok(());
        }
        self.db.checkpoint().await.map_err(reclassify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_path_appends_suffix() {
        assert_eq!(
            index_path_for(Path::new("/var/lib/mnemo/memory.db")),
            PathBuf::from("/var/lib/mnemo/memory.db.index")
        );
    }

    #[tokio::test]
    async fn meta_round_trip_and_overwrite() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        assert!(db.meta(META_STRATEGY).await.unwrap().is_none());
        db.set_meta(META_STRATEGY, "lexical".into()).await.unwrap();
        db.set_meta(META_STRATEGY, "semantic".into()).await.unwrap();
        assert_eq!(db.meta(META_STRATEGY).await.unwrap().as_deref(), Some("semantic"));
    }

    #[tokio::test]
    async fn write_entry_replaces_previous_tags() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        db.write_entry("a".into(), vec!["x".into()], Some("first".into()), None, None)
            .await
            .unwrap();
        db.write_entry("a".into(), vec!["y".into()], Some("second".into()), None, None)
            .await
            .unwrap();

        assert_eq!(db.len().await.unwrap(), 1);
        assert!(db.filtered(&["x".into()], 10).await.unwrap().is_empty());
        assert_eq!(db.filtered(&["y".into()], 10).await.unwrap().len(), 1);
        assert!(db
            .full_text("\"first\"".into(), &[], 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_writes_nothing() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        db.write_entry("a".into(), vec![], None, Some(vec![0; 12]), Some(3))
            .await
            .unwrap();
        let rejected = db
            .write_entry("b".into(), vec![], None, Some(vec![0; 16]), Some(4))
            .await;
        assert!(matches!(rejected, Err(MnemoError::Index { .. })));
        assert_eq!(db.len().await.unwrap(), 1);
        assert_eq!(db.dimensions().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn clear_resets_entries_and_dimensions() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        db.set_meta(META_STRATEGY, "semantic".into()).await.unwrap();
        db.write_entry("a".into(), vec!["t".into()], None, Some(vec![0; 8]), Some(2))
            .await
            .unwrap();
        db.clear().await.unwrap();
        assert_eq!(db.len().await.unwrap(), 0);
        assert_eq!(db.dimensions().await.unwrap(), None);
        assert_eq!(db.meta(META_STRATEGY).await.unwrap().as_deref(), Some("semantic"));
    }

    #[tokio::test]
    async fn clear_marks_the_index_incomplete_until_finished() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        assert!(db.meta(META_REBUILDING).await.unwrap().is_none());
        db.clear().await.unwrap();
        assert!(db.meta(META_REBUILDING).await.unwrap().is_some());
        db.finish_rebuild().await.unwrap();
        assert!(db.meta(META_REBUILDING).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_unknown_is_not_found() {
        let db = IndexDatabase::open_in_memory().await.unwrap();
        assert!(db.remove("ghost").await.unwrap_err().is_not_found());
    }
}
