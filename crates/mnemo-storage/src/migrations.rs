// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store schema, embedded with refinery and applied on open.

use mnemo_core::MnemoError;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Bring the record store schema up to date.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), MnemoError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| MnemoError::Storage {
            source: Box::new(e),
        })?;
    for applied in report.applied_migrations() {
        debug!(
            version = applied.version(),
            name = applied.name(),
            "applied record store migration"
        );
    }
    Ok(())
}

/// Highest applied migration version. Expects `run_migrations` to have run.
pub fn schema_version(conn: &mut rusqlite::Connection) -> Result<Option<i32>, MnemoError> {
    let last = embedded::migrations::runner()
        .get_last_applied_migration(conn)
        .map_err(|e| MnemoError::Storage {
            source: Box::new(e),
        })?;
    Ok(last.map(|m| m.version()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_create_the_memories_table_once() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(schema_version(&mut conn).unwrap(), Some(1));

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('memories') ORDER BY cid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            columns,
            ["seq", "id", "content", "kind", "tags", "embedding", "created_at", "updated_at"]
        );
    }
}
