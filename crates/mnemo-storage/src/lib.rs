// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Mnemo memory engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the [`RecordStore`]: the
//! durable source of truth for memory records.

pub mod database;
pub mod migrations;
pub mod records;

pub use database::Database;
pub use records::{RecordStore, PAGE_SIZE};
