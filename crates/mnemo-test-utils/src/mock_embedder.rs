// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter for deterministic testing.
//!
//! `MockEmbedder` hashes each lowercase alphanumeric token into a bucket and
//! L2-normalizes the counts, so texts sharing words have high cosine
//! similarity and unrelated texts are near zero. No network access.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use mnemo_core::traits::{EmbeddingAdapter, PluginAdapter};
use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::MnemoError;

/// Default vector length produced by [`MockEmbedder::new`].
pub const MOCK_DIMENSIONS: usize = 256;

/// A deterministic embedder with an on/off failure switch and a call counter.
pub struct MockEmbedder {
    dimensions: usize,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Create an embedder producing [`MOCK_DIMENSIONS`]-length vectors.
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    /// Create an embedder producing vectors of the given length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent `embed` call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Vector length produced by this embedder.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let bucket = (fnv1a(token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MnemoError::embedding("mock embedder: provider unavailable"));
        }

        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn same_text_same_vector() {
        let embedder = MockEmbedder::new();
        assert_eq!(embedder.vector_for("Hello world"), embedder.vector_for("hello WORLD"));
    }

    #[test]
    fn shared_words_score_higher() {
        let embedder = MockEmbedder::new();
        let query = embedder.vector_for("capital of France");
        let paris = embedder.vector_for("The capital of France is Paris");
        let water = embedder.vector_for("Water boils at 100C");
        assert!(cosine(&query, &paris) > cosine(&query, &water));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = MockEmbedder::with_dimensions(8);
        assert_eq!(embedder.vector_for("  "), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn failure_switch_and_call_counter() {
        let embedder = MockEmbedder::new();
        let input = || EmbeddingInput {
            texts: vec!["x".into()],
        };
        embedder.embed(input()).await.unwrap();
        embedder.set_failing(true);
        assert!(matches!(
            embedder.embed(input()).await,
            Err(MnemoError::Embedding { .. })
        ));
        assert_eq!(embedder.calls(), 2);
    }
}
