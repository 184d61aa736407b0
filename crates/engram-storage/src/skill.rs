//! Skill storage - content-addressed persistence for procedural memory.
//!
//! # Tables
//!
//! - `skills`: name -> skill record
//! - `skill_hash_index`: content_hash -> name (for deduplication)

use anyhow::Result;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

use engram_models::SkillRecord;
use engram_traits::{PutOutcome, SkillRegistry, StoreError};

const SKILLS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("skills");
/// Index: content_hash -> skill name (for deduplication)
const HASH_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("skill_hash_index");

/// Low-level skill storage with content-hash deduplication
#[derive(Debug, Clone)]
pub struct SkillStorage {
    db: Arc<Database>,
}

impl SkillStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SKILLS_TABLE)?;
        write_txn.open_table(HASH_INDEX_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store a skill if no record with the same content hash exists.
    pub fn put_if_absent(&self, record: &SkillRecord) -> Result<PutOutcome> {
        let data = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let existing = {
                let hash_index = write_txn.open_table(HASH_INDEX_TABLE)?;
                hash_index
                    .get(record.content_hash.as_str())?
                    .map(|value| value.value().to_string())
            };

            if let Some(existing_name) = existing {
                PutOutcome::Existing(existing_name)
            } else {
                let mut skills = write_txn.open_table(SKILLS_TABLE)?;
                skills.insert(record.name.as_str(), data.as_slice())?;

                let mut hash_index = write_txn.open_table(HASH_INDEX_TABLE)?;
                hash_index.insert(record.content_hash.as_str(), record.name.as_str())?;

                PutOutcome::Created(record.name.clone())
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Get a skill by name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<SkillRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SKILLS_TABLE)?;

        if let Some(data) = table.get(name)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    /// Check if a skill name exists.
    pub fn contains(&self, name: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SKILLS_TABLE)?;
        Ok(table.get(name)?.is_some())
    }

    /// List all registered skill names.
    pub fn list(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SKILLS_TABLE)?;

        let mut names = Vec::new();
        for item in table.iter()? {
            let (key, _) = item?;
            names.push(key.value().to_string());
        }

        Ok(names)
    }

    /// Delete a skill and its hash-index entry.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let record = match self.get_by_name(name)? {
            Some(record) => record,
            None => return Ok(false),
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut skills = write_txn.open_table(SKILLS_TABLE)?;
            skills.remove(name)?;
            let mut hash_index = write_txn.open_table(HASH_INDEX_TABLE)?;
            hash_index.remove(record.content_hash.as_str())?;
        }
        write_txn.commit()?;
        Ok(true)
    }
}

#[async_trait]
impl SkillRegistry for SkillStorage {
    async fn put(&self, record: SkillRecord) -> engram_traits::Result<PutOutcome> {
        self.put_if_absent(&record).map_err(StoreError::from)
    }

    async fn get(&self, name: &str) -> engram_traits::Result<Option<SkillRecord>> {
        self.get_by_name(name).map_err(StoreError::from)
    }

    async fn exists(&self, name: &str) -> engram_traits::Result<bool> {
        self.contains(name).map_err(StoreError::from)
    }

    async fn list_names(&self) -> engram_traits::Result<Vec<String>> {
        self.list().map_err(StoreError::from)
    }
}
