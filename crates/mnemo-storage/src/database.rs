// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements on one [`Database`] are serialized through tokio-rusqlite's
//! single background thread. Clones share that thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mnemo_config::model::StorageConfig;
use mnemo_core::MnemoError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// A schema migration step run on the connection thread.
pub type Migrate = fn(&mut rusqlite::Connection) -> Result<(), MnemoError>;

/// Handle to one SQLite file (or in-memory database).
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the record store database at `path`, creating parent directories,
    /// applying PRAGMAs and running the record store migrations.
    pub async fn open(path: impl AsRef<Path>, config: &StorageConfig) -> Result<Self, MnemoError> {
        let db = Self::open_with(
            path.as_ref(),
            config.wal_mode,
            config.busy_timeout_ms,
            crate::migrations::run_migrations,
        )
        .await?;
        Ok(db)
    }

    /// Open a private in-memory record store database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, MnemoError> {
        Self::open_in_memory_with(crate::migrations::run_migrations).await
    }

    /// Open `path` with the given durability settings and schema.
    ///
    /// Other SQLite-backed artifacts (the search index) reuse this with their own
    /// migration set.
    pub async fn open_with(
        path: &Path,
        wal_mode: bool,
        busy_timeout_ms: u64,
        migrate: Migrate,
    ) -> Result<Self, MnemoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;

        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.apply_pragmas(wal_mode, busy_timeout_ms).await?;
        db.migrate(migrate).await?;
        debug!(path = %path.display(), wal_mode, "database opened");
        Ok(db)
    }

    /// Open an in-memory database with the given schema.
    pub async fn open_in_memory_with(migrate: Migrate) -> Result<Self, MnemoError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn, path: None };
        db.apply_pragmas(false, 0).await?;
        db.migrate(migrate).await?;
        Ok(db)
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// File path, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), MnemoError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn apply_pragmas(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), MnemoError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.query_row("PRAGMA journal_mode = WAL", [], |row| {
                        row.get::<_, String>(0)
                    })?;
                }
                conn.execute_batch("PRAGMA synchronous = FULL; PRAGMA foreign_keys = ON;")?;
                conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn migrate(&self, migrate: Migrate) -> Result<(), MnemoError> {
        self.conn
            .call(move |conn| -> Result<Result<(), MnemoError>, rusqlite::Error> {
                Ok(migrate(conn))
            })
            .await
            .map_err(map_tr_err)?
    }
}

/// Convert tokio-rusqlite errors into [`MnemoError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MnemoError {
    MnemoError::Storage {
        source: Box::new(e),
    }
}
