//! Relation storage - entity-relationship triples with subject lookup.
//!
//! Triples are keyed `subject|relation|object`, so exact subject lookup is a
//! prefix scan and repeated MERGE-style writes are naturally idempotent.

use anyhow::Result;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

use engram_models::RelationTriple;
use engram_traits::{RelationStore, StoreError};

const RELATION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("relations");

/// Low-level relation storage with byte-level API
#[derive(Debug, Clone)]
pub struct RelationStorage {
    db: Arc<Database>,
}

impl RelationStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(RELATION_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store a triple. Re-storing an existing triple overwrites in place.
    pub fn put_triple(&self, triple: &RelationTriple) -> Result<()> {
        let data = serde_json::to_vec(triple)?;
        let key = triple.key();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RELATION_TABLE)?;
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List all triples with an exactly matching subject.
    pub fn list_by_subject(&self, subject: &str) -> Result<Vec<RelationTriple>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELATION_TABLE)?;

        let prefix = format!("{}|", subject);
        let mut triples = Vec::new();

        for item in table.iter()? {
            let (key, value) = item?;
            if key.value().starts_with(&prefix) {
                triples.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(triples)
    }

    /// Substring search over subjects, bounded by `limit`.
    pub fn list_by_keyword(&self, keyword: &str, limit: usize) -> Result<Vec<RelationTriple>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELATION_TABLE)?;

        let mut triples = Vec::new();

        for item in table.iter()? {
            if triples.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let triple: RelationTriple = serde_json::from_slice(value.value())?;
            if triple.subject.contains(keyword) {
                triples.push(triple);
            }
        }

        Ok(triples)
    }

    /// Count all stored triples.
    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELATION_TABLE)?;
        let mut count = 0usize;
        for item in table.iter()? {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl RelationStore for RelationStorage {
    async fn add(&self, triple: RelationTriple) -> engram_traits::Result<()> {
        self.put_triple(&triple).map_err(StoreError::from)
    }

    async fn related(&self, subject: &str) -> engram_traits::Result<Vec<RelationTriple>> {
        self.list_by_subject(subject).map_err(StoreError::from)
    }

    async fn related_fuzzy(
        &self,
        keyword: &str,
        limit: usize,
    ) -> engram_traits::Result<Vec<RelationTriple>> {
        self.list_by_keyword(keyword, limit).map_err(StoreError::from)
    }
}
