//! Long-term store contracts.
//!
//! These traits define the persistence interfaces the policy layer requires.
//! One concrete adapter exists per backend technology (engram-storage ships
//! the embedded-database reference adapters); the core depends only on these
//! shapes. All methods are async because persistence writes, vector-index
//! updates in particular, can be slow and must not starve a session's
//! reasoning loop.

use async_trait::async_trait;
use serde_json::Value;

use engram_models::{MemoryItem, RelationTriple, SkillRecord, VectorPartition};

use crate::error::Result;

/// Outcome of a content-addressed put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Created(String),
    Existing(String),
}

impl PutOutcome {
    pub fn id(&self) -> &str {
        match self {
            PutOutcome::Created(id) | PutOutcome::Existing(id) => id,
        }
    }
}

// ── StructuredStore ──────────────────────────────────────────────────

/// Namespaced key/value persistence for per-user scalar facts.
#[async_trait]
pub trait StructuredStore: Send + Sync {
    /// Upsert a value under `(user_id, key)`.
    async fn set(&self, user_id: &str, key: &str, value: Value) -> Result<()>;

    /// Fetch the value under `(user_id, key)`, if present.
    async fn get(&self, user_id: &str, key: &str) -> Result<Option<Value>>;

    /// List all keys recorded for a user.
    async fn list_keys(&self, user_id: &str) -> Result<Vec<String>>;
}

// ── RelationStore ────────────────────────────────────────────────────

/// Typed entity-relationship graph for durable factual associations.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Record a triple; storing the same triple twice is a no-op.
    async fn add(&self, triple: RelationTriple) -> Result<()>;

    /// All triples whose subject matches exactly.
    async fn related(&self, subject: &str) -> Result<Vec<RelationTriple>>;

    /// Substring fallback over subjects, bounded by `limit`.
    async fn related_fuzzy(&self, keyword: &str, limit: usize) -> Result<Vec<RelationTriple>>;
}

// ── VectorStore ──────────────────────────────────────────────────────

/// A nearest-neighbor match returned from a vector partition.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub item: MemoryItem,
    /// Cosine distance (0 = identical)
    pub distance: f32,
}

/// Embedding-indexed store partitioned by semantic kind.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert an item (which must carry an embedding) into a partition.
    /// Returns the stored item id.
    async fn insert(&self, partition: VectorPartition, item: MemoryItem) -> Result<String>;

    /// Nearest-neighbor search within one partition. Expired items are
    /// filtered at read time.
    async fn search(
        &self,
        partition: VectorPartition,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>>;

    /// Number of live items in a partition.
    async fn count(&self, partition: VectorPartition) -> Result<usize>;
}

// ── SkillRegistry ────────────────────────────────────────────────────

/// Content-addressed store of named executable procedures.
#[async_trait]
pub trait SkillRegistry: Send + Sync {
    /// Store a skill; an existing record with the same content hash is
    /// returned instead of being duplicated.
    async fn put(&self, record: SkillRecord) -> Result<PutOutcome>;

    /// Load a skill by name.
    async fn get(&self, name: &str) -> Result<Option<SkillRecord>>;

    /// Check whether a skill name is registered.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// List all registered skill names.
    async fn list_names(&self) -> Result<Vec<String>>;
}
