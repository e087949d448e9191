// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for engine-level integration testing.
//!
//! `TestHarness` owns a temp directory holding the record store and its index
//! artifact, a [`MnemoConfig`] pointing at it, and a shared [`MockEmbedder`].
//! The directory is removed on drop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mnemo_config::MnemoConfig;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::types::IndexStrategy;
use mnemo_core::MnemoError;

use crate::mock_embedder::MockEmbedder;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    strategy: IndexStrategy,
    verify_on_open: bool,
    dimensions: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            strategy: IndexStrategy::Lexical,
            verify_on_open: true,
            dimensions: None,
        }
    }

    /// Select the index strategy.
    pub fn with_strategy(mut self, strategy: IndexStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Toggle the entry-count comparison on engine open.
    pub fn with_verify_on_open(mut self, verify: bool) -> Self {
        self.verify_on_open = verify;
        self
    }

    /// Use a mock embedder with a non-default vector length.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Create the temp directory and the configuration.
    pub fn build(self) -> Result<TestHarness, MnemoError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| MnemoError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("memory.db");

        let embedder = Arc::new(match self.dimensions {
            Some(dims) => MockEmbedder::with_dimensions(dims),
            None => MockEmbedder::new(),
        });

        let mut config = MnemoConfig::default();
        config.storage.database_path = db_path.to_string_lossy().into_owned();
        config.storage.busy_timeout_ms = 1000;
        config.index.strategy = self.strategy;
        config.index.verify_on_open = self.verify_on_open;
        config.embedding.dimensions = Some(embedder.dimensions());

        Ok(TestHarness {
            config,
            embedder,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A temp on-disk environment for one engine under test.
pub struct TestHarness {
    /// Configuration pointing at the temp database.
    pub config: MnemoConfig,
    /// The mock embedder shared with every engine opened from this harness.
    pub embedder: Arc<MockEmbedder>,
    db_path: PathBuf,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Lexical harness with default settings.
    pub fn lexical() -> Result<Self, MnemoError> {
        Self::builder().build()
    }

    /// Semantic harness with default settings.
    pub fn semantic() -> Result<Self, MnemoError> {
        Self::builder()
            .with_strategy(IndexStrategy::Semantic)
            .build()
    }

    /// The embedder as a trait object, ready to hand to an engine.
    pub fn embedding_adapter(&self) -> Option<Arc<dyn EmbeddingAdapter>> {
        Some(self.embedder.clone() as Arc<dyn EmbeddingAdapter>)
    }

    /// Path of the record store file.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Directory holding the store and the index artifact.
    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_points_config_at_temp_dir() {
        let harness = TestHarness::semantic().unwrap();
        assert_eq!(harness.config.index.strategy, IndexStrategy::Semantic);
        assert!(harness.database_path().starts_with(harness.dir()));
        assert_eq!(
            harness.config.embedding.dimensions,
            Some(harness.embedder.dimensions())
        );
    }

    #[test]
    fn builder_overrides() {
        let harness = TestHarness::builder()
            .with_verify_on_open(false)
            .with_dimensions(16)
            .build()
            .unwrap();
        assert!(!harness.config.index.verify_on_open);
        assert_eq!(harness.embedder.dimensions(), 16);
    }
}
