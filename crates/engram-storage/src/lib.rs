//! Engram Storage - Embedded store adapters for the memory manager.
//!
//! This crate provides the persistence layer for Engram, using redb as the
//! embedded database. Each long-term store contract from engram-traits has
//! one adapter here; the policy layer only ever sees the trait objects.
//!
//! # Tables
//!
//! - `preferences` - Per-user scalar facts, keyed `user_id:key`
//! - `relations` - Entity relationship triples
//! - `memory_vectors` / `memory_items` - Partitioned vector memory
//! - `skills` / `skill_hash_index` - Content-addressed procedural memory

pub mod preference;
pub mod relation;
pub mod skill;
pub mod vector;

mod simple_storage;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use preference::PreferenceStorage;
pub use relation::RelationStorage;
pub use simple_storage::SimpleStorage;
pub use skill::SkillStorage;
pub use vector::{VectorConfig, VectorStorage};

/// Central storage manager that initializes all store subsystems
pub struct Storage {
    db: Arc<Database>,
    pub preferences: Arc<PreferenceStorage>,
    pub relations: Arc<RelationStorage>,
    pub vectors: Arc<VectorStorage>,
    pub skills: Arc<SkillStorage>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: &str, vector_config: VectorConfig) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);

        let preferences = Arc::new(PreferenceStorage::new(db.clone())?);
        let relations = Arc::new(RelationStorage::new(db.clone())?);
        let vectors = Arc::new(VectorStorage::new(db.clone(), vector_config)?);
        let skills = Arc::new(SkillStorage::new(db.clone())?);

        Ok(Self {
            db,
            preferences,
            relations,
            vectors,
            skills,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
