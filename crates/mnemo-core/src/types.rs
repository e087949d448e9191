// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the record store, the index adapters and the engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Index,
    Embedding,
}

/// Classification of a stored memory.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemoryKind {
    /// A standalone statement of fact.
    #[default]
    Fact,
    /// Something said in a conversation.
    Conversation,
    /// A pointer to an external source.
    Reference,
}

impl MemoryKind {
    /// All accepted kinds, in the order they are advertised to tool callers.
    pub const ALL: [MemoryKind; 3] = [
        MemoryKind::Fact,
        MemoryKind::Conversation,
        MemoryKind::Reference,
    ];

    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Conversation => "conversation",
            MemoryKind::Reference => "reference",
        }
    }
}

/// A persisted memory record. The record store is the source of truth for these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Globally unique, immutable identifier.
    pub id: String,
    /// The remembered text.
    pub content: String,
    /// Classification of the memory.
    pub kind: MemoryKind,
    /// Exact-match filter tags (set semantics, stored sorted).
    pub tags: Vec<String>,
    /// Embedding vector, present only when semantic indexing produced one.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp. Equal to `created_at` until updates exist.
    pub updated_at: String,
}

/// Which index strategy backs the engine. Chosen once, at construction.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndexStrategy {
    /// Inverted index over content tokens and tags, BM25 ranking.
    #[default]
    Lexical,
    /// Cosine similarity over embedding vectors.
    Semantic,
}

/// The derived index entry for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

impl IndexEntry {
    /// Derive the index entry for a stored record.
    pub fn from_record(record: &MemoryRecord) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            tags: record.tags.clone(),
            embedding: record.embedding.clone(),
        }
    }
}

/// Normalized free-text component of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// The trimmed query text as the caller wrote it (embedded for semantic search).
    pub raw: String,
    /// Lowercased, deduplicated search terms (matched for lexical search).
    pub terms: Vec<String>,
}

/// A composite query handed to an index adapter.
///
/// `text == None` means no relevance component: every entry passing the tag
/// filters qualifies. Tags are always conjunctive.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub text: Option<TextQuery>,
    pub tags: Vec<String>,
    pub limit: usize,
    /// Query embedding, filled in by the engine when the semantic strategy is active.
    pub vector: Option<Vec<f32>>,
}

impl IndexQuery {
    /// True when the query has neither a text component nor tag filters.
    pub fn is_match_all(&self) -> bool {
        self.text.is_none() && self.tags.is_empty()
    }
}

/// One ranked index result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    /// Higher is better. Cosine similarity for semantic, negated BM25 for lexical.
    pub score: f32,
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter: one vector per input text, same order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
