//! Memory item model - the unit of long-term persistence.
//!
//! A [`MemoryItem`] is written once by the store that owns it and is never
//! mutated afterwards; the only post-write state change is TTL-driven expiry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Long-term Memory                           │
//! │                                                               │
//! │  MemoryItem                                                   │
//! │  ├── id: "item-abc123"                                       │
//! │  ├── kind: Semantic                                          │
//! │  ├── payload: "Microservices decompose a system into..."     │
//! │  ├── provenance: { session, round, source }                  │
//! │  └── ttl_secs: None                                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::time_utils;

/// Storage disposition of a memory item.
///
/// The kind determines which long-term backend owns the item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Concrete events: meetings, dates, places, task outcomes
    Episodic,
    /// Knowledge: concepts, principles, architecture discussions
    Semantic,
    /// Per-user scalar facts: habits, styles, format preferences
    Preference,
    /// Named executable procedures and workflows
    Procedural,
    /// Typed entity-to-entity associations
    Relation,
}

impl MemoryKind {
    /// Stable string tag used in summaries and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Episodic => "episodic",
            MemoryKind::Semantic => "semantic",
            MemoryKind::Preference => "preference",
            MemoryKind::Procedural => "procedural",
            MemoryKind::Relation => "relation",
        }
    }
}

/// Partition of the vector store.
///
/// Episodic and semantic items are classified out of conversation; documents
/// are injected reference material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VectorPartition {
    Episodic,
    Semantic,
    Document,
}

impl VectorPartition {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorPartition::Episodic => "episodic",
            VectorPartition::Semantic => "semantic",
            VectorPartition::Document => "document",
        }
    }
}

/// SHA-256 hex digest of `text`, as used for content addressing.
pub fn content_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Where a memory item came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Provenance {
    /// Session the item was captured in
    #[serde(default)]
    pub session_id: Option<String>,
    /// Round counter at capture time
    #[serde(default)]
    pub round: u64,
    /// Producing component (e.g. "classifier", "overflow_archive")
    #[serde(default)]
    pub source: String,
}

/// A single unit of long-term memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    /// Unique identifier for this item
    pub id: String,

    /// Storage disposition
    pub kind: MemoryKind,

    /// The persisted content (text)
    pub payload: String,

    /// SHA-256 hash of the payload for write deduplication
    pub content_hash: String,

    /// Vector embedding for semantic search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Origin of this item
    #[serde(default)]
    pub provenance: Provenance,

    /// Unix timestamp in milliseconds when this item was created
    pub created_at: i64,

    /// Optional lifetime in seconds; expired items are filtered at read time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl MemoryItem {
    /// Create a new memory item with required fields.
    ///
    /// Generates a unique ID and content hash automatically.
    pub fn new(kind: MemoryKind, payload: String) -> Self {
        let id = format!("item-{}", uuid::Uuid::new_v4());
        let content_hash = content_hash(&payload);
        let created_at = time_utils::now_ms();

        Self {
            id,
            kind,
            payload,
            content_hash,
            embedding: None,
            provenance: Provenance::default(),
            created_at,
            ttl_secs: None,
        }
    }

    /// Create an item with a specific ID (for deserialization/testing)
    #[must_use]
    pub fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    /// Set the provenance
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Attach an embedding to this item
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set the lifetime
    #[must_use]
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Check if this item has an embedding
    #[must_use]
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Check whether the item's TTL has elapsed at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.ttl_secs {
            Some(ttl) => now_ms.saturating_sub(self.created_at) > (ttl as i64) * 1000,
            None => false,
        }
    }
}
