// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search result types and vector math.

use mnemo_core::MemoryRecord;
use serde::Serialize;

/// A hydrated search hit: the stored record plus the index score that ranked it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    /// The memory record.
    #[serde(flatten)]
    pub record: MemoryRecord,
    /// Cosine similarity (semantic), negated BM25 (lexical) or 1.0 (unranked).
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
