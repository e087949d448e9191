// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting index wrapper.
//!
//! `FlakyIndex` delegates to a real index adapter and fails individual
//! operations on demand, for exercising the engine's stored-but-not-indexed
//! and delete-retry paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use mnemo_core::traits::{IndexAdapter, PluginAdapter};
use mnemo_core::types::{
    AdapterType, HealthStatus, IndexEntry, IndexHit, IndexQuery, IndexStrategy,
};
use mnemo_core::MnemoError;

/// An [`IndexAdapter`] that can be told to fail `upsert`, `query` or `remove`.
pub struct FlakyIndex {
    inner: Arc<dyn IndexAdapter>,
    fail_upsert: AtomicBool,
    fail_query: AtomicBool,
    fail_remove: AtomicBool,
}

impl FlakyIndex {
    /// Wrap `inner`. All operations pass through until a failure is switched on.
    pub fn new(inner: Arc<dyn IndexAdapter>) -> Self {
        Self {
            inner,
            fail_upsert: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// The wrapped adapter, for direct inspection in assertions.
    pub fn inner(&self) -> &Arc<dyn IndexAdapter> {
        &self.inner
    }
}

fn injected(op: &str) -> MnemoError {
    MnemoError::index(format!("injected {op} failure"))
}

#[async_trait]
impl PluginAdapter for FlakyIndex {
    fn name(&self) -> &str {
        "flaky-index"
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Index
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl IndexAdapter for FlakyIndex {
    fn strategy(&self) -> IndexStrategy {
        self.inner.strategy()
    }

    async fn upsert(&self, entry: IndexEntry) -> Result<(), MnemoError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(injected("upsert"));
        }
        self.inner.upsert(entry).await
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, MnemoError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(injected("query"));
        }
        self.inner.query(query).await
    }

    async fn remove(&self, id: &str) -> Result<(), MnemoError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("remove"));
        }
        self.inner.remove(id).await
    }

    async fn len(&self) -> Result<usize, MnemoError> {
        self.inner.len().await
    }

    async fn clear(&self) -> Result<(), MnemoError> {
        self.inner.clear().await
    }

    async fn finish_rebuild(&self) -> Result<(), MnemoError> {
        self.inner.finish_rebuild().await
    }
}
