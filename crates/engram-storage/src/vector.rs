//! Vector storage using HNSW for approximate nearest neighbor search.
//!
//! Provides partitioned vector storage with persistence to ReDB. One HNSW
//! index per partition (episodic / semantic / document) is kept in memory for
//! fast search, with vectors and item payloads persisted to the database for
//! durability and rebuilt on load.

use anyhow::Result;
use async_trait::async_trait;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::sync::Arc;

use engram_models::{MemoryItem, VectorPartition, now_ms};
use engram_traits::{StoreError, VectorMatch, VectorStore};

type VectorIndex = Hnsw<'static, f32, DistCosine>;

const VECTOR_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memory_vectors");
const ITEM_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memory_items");

const ALL_PARTITIONS: [VectorPartition; 3] = [
    VectorPartition::Episodic,
    VectorPartition::Semantic,
    VectorPartition::Document,
];

/// Configuration for vector storage.
#[derive(Debug, Clone)]
pub struct VectorConfig {
    /// Vector dimension (e.g. 1024 for qwen3-embedding-0.6b)
    pub dimension: usize,
    /// Maximum number of connections per node (16-64 typical)
    pub max_connections: usize,
    /// Search width during construction (200-800 typical)
    pub ef_construction: usize,
    /// Search width during queries
    pub ef_search: usize,
    /// Maximum elements to store per partition
    pub max_elements: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 1024,
            max_connections: 16,
            ef_construction: 200,
            ef_search: 50,
            max_elements: 100_000,
        }
    }
}

/// In-memory index state for one partition.
struct PartitionState {
    index: VectorIndex,
    /// item_id -> internal vector ID
    id_map: HashMap<String, usize>,
    /// internal vector ID -> item_id
    reverse_map: HashMap<usize, String>,
    /// Next available vector ID
    next_id: usize,
}

impl PartitionState {
    fn new(config: &VectorConfig) -> Self {
        let index: VectorIndex = Hnsw::new(
            config.max_connections,
            config.max_elements,
            16,
            config.ef_construction,
            DistCosine,
        );
        Self {
            index,
            id_map: HashMap::new(),
            reverse_map: HashMap::new(),
            next_id: 0,
        }
    }
}

/// Partitioned vector storage with HNSW indexes.
pub struct VectorStorage {
    db: Arc<Database>,
    config: VectorConfig,
    /// In-memory indexes, rebuilt on load
    partitions: RwLock<HashMap<VectorPartition, PartitionState>>,
}

fn row_key(partition: VectorPartition, item_id: &str) -> String {
    format!("{}:{}", partition.as_str(), item_id)
}

fn parse_partition(tag: &str) -> Option<VectorPartition> {
    match tag {
        "episodic" => Some(VectorPartition::Episodic),
        "semantic" => Some(VectorPartition::Semantic),
        "document" => Some(VectorPartition::Document),
        _ => None,
    }
}

impl VectorStorage {
    /// Create new vector storage, loading existing vectors from DB.
    pub fn new(db: Arc<Database>, config: VectorConfig) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(VECTOR_TABLE)?;
        write_txn.open_table(ITEM_TABLE)?;
        write_txn.commit()?;

        let mut partitions = HashMap::new();
        for partition in ALL_PARTITIONS {
            partitions.insert(partition, PartitionState::new(&config));
        }

        let storage = Self {
            db,
            config,
            partitions: RwLock::new(partitions),
        };

        storage.rebuild_indexes()?;
        Ok(storage)
    }

    /// Add an item and its embedding to a partition.
    pub fn add(&self, partition: VectorPartition, item: &MemoryItem) -> Result<()> {
        let vector = item
            .embedding
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("item {} carries no embedding", item.id))?;

        if vector.len() != self.config.dimension {
            anyhow::bail!(
                "Vector dimension mismatch: expected {}, got {}",
                self.config.dimension,
                vector.len()
            );
        }

        if self.partitions.read()[&partition].id_map.contains_key(&item.id) {
            self.delete(partition, &item.id)?;
        }

        self.persist_item(partition, item, vector)?;

        let mut partitions = self.partitions.write();
        let state = partitions
            .get_mut(&partition)
            .ok_or_else(|| anyhow::anyhow!("unknown partition"))?;

        let vector_id = state.next_id;
        state.next_id += 1;
        state.index.insert((vector, vector_id));
        state.id_map.insert(item.id.clone(), vector_id);
        state.reverse_map.insert(vector_id, item.id.clone());

        Ok(())
    }

    /// Delete an item from a partition.
    pub fn delete(&self, partition: VectorPartition, item_id: &str) -> Result<bool> {
        {
            let mut partitions = self.partitions.write();
            let state = partitions
                .get_mut(&partition)
                .ok_or_else(|| anyhow::anyhow!("unknown partition"))?;

            let vector_id = match state.id_map.remove(item_id) {
                Some(id) => id,
                None => return Ok(false),
            };
            state.reverse_map.remove(&vector_id);
        }

        let key = row_key(partition, item_id);
        let write_txn = self.db.begin_write()?;
        {
            let mut vectors = write_txn.open_table(VECTOR_TABLE)?;
            vectors.remove(key.as_str())?;
            let mut items = write_txn.open_table(ITEM_TABLE)?;
            items.remove(key.as_str())?;
        }
        write_txn.commit()?;

        Ok(true)
    }

    /// Search for similar items within a partition.
    ///
    /// Expired items are filtered at read time regardless of sweep cadence.
    pub fn search_partition(
        &self,
        partition: VectorPartition,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(MemoryItem, f32)>> {
        if query.len() != self.config.dimension {
            anyhow::bail!(
                "Query dimension mismatch: expected {}, got {}",
                self.config.dimension,
                query.len()
            );
        }

        let candidate_ids: Vec<(String, f32)> = {
            let partitions = self.partitions.read();
            let state = partitions
                .get(&partition)
                .ok_or_else(|| anyhow::anyhow!("unknown partition"))?;

            // Over-fetch to account for expired entries filtered below
            let search_k = top_k * 2;
            let results = state.index.search(query, search_k, self.config.ef_search);
            results
                .into_iter()
                .filter_map(|neighbour| {
                    let item_id = state.reverse_map.get(&neighbour.d_id)?;
                    Some((item_id.clone(), neighbour.distance))
                })
                .collect()
        };

        let now = now_ms();
        let read_txn = self.db.begin_read()?;
        let items = read_txn.open_table(ITEM_TABLE)?;

        let mut matches = Vec::new();
        for (item_id, distance) in candidate_ids {
            if matches.len() >= top_k {
                break;
            }
            let key = row_key(partition, &item_id);
            if let Some(data) = items.get(key.as_str())? {
                let item: MemoryItem = serde_json::from_slice(data.value())?;
                if item.is_expired(now) {
                    continue;
                }
                matches.push((item, distance));
            }
        }

        Ok(matches)
    }

    /// Count live (non-expired) items in a partition.
    pub fn count_live(&self, partition: VectorPartition) -> Result<usize> {
        let now = now_ms();
        let read_txn = self.db.begin_read()?;
        let items = read_txn.open_table(ITEM_TABLE)?;

        let prefix = format!("{}:", partition.as_str());
        let mut count = 0usize;

        for entry in items.iter()? {
            let (key, value) = entry?;
            if key.value().starts_with(&prefix) {
                let item: MemoryItem = serde_json::from_slice(value.value())?;
                if !item.is_expired(now) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    fn persist_item(
        &self,
        partition: VectorPartition,
        item: &MemoryItem,
        vector: &[f32],
    ) -> Result<()> {
        // The embedding lives in its own table; the stored payload omits it.
        let mut stored = item.clone();
        stored.embedding = None;

        let key = row_key(partition, &item.id);
        let vector_bytes = bincode::serde::encode_to_vec(vector, bincode::config::standard())?;
        let item_bytes = serde_json::to_vec(&stored)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut vectors = write_txn.open_table(VECTOR_TABLE)?;
            vectors.insert(key.as_str(), vector_bytes.as_slice())?;
            let mut items = write_txn.open_table(ITEM_TABLE)?;
            items.insert(key.as_str(), item_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn rebuild_indexes(&self) -> Result<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VECTOR_TABLE)?;

        let mut vectors: Vec<(VectorPartition, String, Vec<f32>)> = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key_str = key.value();
            let Some((tag, item_id)) = key_str.split_once(':') else {
                continue;
            };
            let Some(partition) = parse_partition(tag) else {
                continue;
            };
            let (vector, _): (Vec<f32>, usize) =
                bincode::serde::decode_from_slice(value.value(), bincode::config::standard())?;
            vectors.push((partition, item_id.to_string(), vector));
        }
        drop(read_txn);

        let mut partitions = self.partitions.write();
        for partition in ALL_PARTITIONS {
            partitions.insert(partition, PartitionState::new(&self.config));
        }

        let mut total = 0usize;
        for (partition, item_id, vector) in vectors {
            let Some(state) = partitions.get_mut(&partition) else {
                continue;
            };
            let vector_id = state.next_id;
            state.next_id += 1;
            state.index.insert((vector.as_slice(), vector_id));
            state.id_map.insert(item_id.clone(), vector_id);
            state.reverse_map.insert(vector_id, item_id);
            total += 1;
        }

        tracing::info!("Rebuilt vector indexes with {} vectors", total);
        Ok(())
    }
}

#[async_trait]
impl VectorStore for VectorStorage {
    async fn insert(
        &self,
        partition: VectorPartition,
        item: MemoryItem,
    ) -> engram_traits::Result<String> {
        self.add(partition, &item).map_err(StoreError::from)?;
        Ok(item.id)
    }

    async fn search(
        &self,
        partition: VectorPartition,
        query: &[f32],
        top_k: usize,
    ) -> engram_traits::Result<Vec<VectorMatch>> {
        let matches = self
            .search_partition(partition, query, top_k)
            .map_err(StoreError::from)?;
        Ok(matches
            .into_iter()
            .map(|(item, distance)| VectorMatch { item, distance })
            .collect())
    }

    async fn count(&self, partition: VectorPartition) -> engram_traits::Result<usize> {
        self.count_live(partition).map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_models::MemoryKind;
    use tempfile::tempdir;

    fn create_test_storage(dim: usize) -> VectorStorage {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let config = VectorConfig {
            dimension: dim,
            max_connections: 8,
            ef_construction: 100,
            ef_search: 50,
            max_elements: 1000,
        };
        VectorStorage::new(db, config).unwrap()
    }

    fn item(payload: &str, embedding: Vec<f32>) -> MemoryItem {
        MemoryItem::new(MemoryKind::Episodic, payload.to_string()).with_embedding(embedding)
    }

    #[test]
    fn test_add_and_search() {
        let storage = create_test_storage(4);
        let a = item("board meeting tomorrow", vec![1.0, 0.0, 0.0, 0.0]);
        let b = item("lunch plans", vec![0.0, 1.0, 0.0, 0.0]);
        let c = item("strategy meeting next week", vec![0.9, 0.1, 0.0, 0.0]);

        storage.add(VectorPartition::Episodic, &a).unwrap();
        storage.add(VectorPartition::Episodic, &b).unwrap();
        storage.add(VectorPartition::Episodic, &c).unwrap();

        let results = storage
            .search_partition(VectorPartition::Episodic, &[1.0, 0.0, 0.0, 0.0], 2)
            .unwrap();
        assert!(!results.is_empty());
        let payloads: Vec<&str> = results.iter().map(|(m, _)| m.payload.as_str()).collect();
        assert!(payloads.contains(&"board meeting tomorrow"));
    }

    #[test]
    fn test_partition_isolation() {
        let storage = create_test_storage(4);
        let episodic = item("episodic entry", vec![1.0, 0.0, 0.0, 0.0]);
        let semantic = item("semantic entry", vec![1.0, 0.0, 0.0, 0.0]);

        storage.add(VectorPartition::Episodic, &episodic).unwrap();
        storage.add(VectorPartition::Semantic, &semantic).unwrap();

        let results = storage
            .search_partition(VectorPartition::Semantic, &[1.0, 0.0, 0.0, 0.0], 5)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.payload, "semantic entry");
    }

    #[test]
    fn test_dimension_validation() {
        let storage = create_test_storage(4);
        let bad = item("bad", vec![1.0, 0.0, 0.0]);
        assert!(storage.add(VectorPartition::Episodic, &bad).is_err());

        let missing = MemoryItem::new(MemoryKind::Episodic, "no embedding".to_string());
        assert!(storage.add(VectorPartition::Episodic, &missing).is_err());
    }

    #[test]
    fn test_expired_items_filtered_at_read() {
        let storage = create_test_storage(4);
        let mut expired = item("stale", vec![1.0, 0.0, 0.0, 0.0]).with_ttl(1);
        // Backdate creation so the TTL has already elapsed
        expired.created_at -= 10_000;
        let fresh = item("fresh", vec![0.9, 0.1, 0.0, 0.0]);

        storage.add(VectorPartition::Episodic, &expired).unwrap();
        storage.add(VectorPartition::Episodic, &fresh).unwrap();

        let results = storage
            .search_partition(VectorPartition::Episodic, &[1.0, 0.0, 0.0, 0.0], 5)
            .unwrap();
        let payloads: Vec<&str> = results.iter().map(|(m, _)| m.payload.as_str()).collect();
        assert!(payloads.contains(&"fresh"));
        assert!(!payloads.contains(&"stale"));

        assert_eq!(storage.count_live(VectorPartition::Episodic).unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage(4);
        let entry = item("to delete", vec![1.0, 0.0, 0.0, 0.0]);
        storage.add(VectorPartition::Episodic, &entry).unwrap();

        assert!(storage.delete(VectorPartition::Episodic, &entry.id).unwrap());
        assert!(!storage.delete(VectorPartition::Episodic, &entry.id).unwrap());

        let results = storage
            .search_partition(VectorPartition::Episodic, &[1.0, 0.0, 0.0, 0.0], 5)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_rebuild_on_reopen() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = VectorConfig {
            dimension: 4,
            max_connections: 8,
            ef_construction: 100,
            ef_search: 50,
            max_elements: 1000,
        };

        let entry = item("durable", vec![1.0, 0.0, 0.0, 0.0]);
        {
            let db = Arc::new(Database::create(&db_path).unwrap());
            let storage = VectorStorage::new(db, config.clone()).unwrap();
            storage.add(VectorPartition::Semantic, &entry).unwrap();
        }

        let db = Arc::new(Database::create(&db_path).unwrap());
        let storage = VectorStorage::new(db, config).unwrap();
        let results = storage
            .search_partition(VectorPartition::Semantic, &[1.0, 0.0, 0.0, 0.0], 1)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.payload, "durable");
    }
}
