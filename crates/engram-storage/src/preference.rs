//! Preference storage - namespaced key/value persistence for per-user facts.
//!
//! Rows are keyed `user_id:key` so listing a user's preferences is a prefix
//! scan over one table.

use anyhow::Result;
use async_trait::async_trait;
use redb::{ReadableDatabase, ReadableTable};
use serde_json::Value;

use engram_traits::{StoreError, StructuredStore};

use crate::{SimpleStorage, define_simple_storage};

define_simple_storage! {
    /// Preference storage with byte-level API.
    pub struct PreferenceStorage { table: "preferences" }
}

fn row_key(user_id: &str, key: &str) -> String {
    format!("{}:{}", user_id, key)
}

impl PreferenceStorage {
    /// Upsert a preference value.
    pub fn set_value(&self, user_id: &str, key: &str, value: &Value) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.put_raw(&row_key(user_id, key), &data)
    }

    /// Fetch a preference value.
    pub fn get_value(&self, user_id: &str, key: &str) -> Result<Option<Value>> {
        match self.get_raw(&row_key(user_id, key))? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// List all preference keys for a user.
    pub fn list_user_keys(&self, user_id: &str) -> Result<Vec<String>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(<Self as SimpleStorage>::TABLE)?;

        let prefix = format!("{}:", user_id);
        let mut keys = Vec::new();

        for entry in table.iter()? {
            let (key, _) = entry?;
            let key_str = key.value();
            if let Some(suffix) = key_str.strip_prefix(&prefix) {
                keys.push(suffix.to_string());
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl StructuredStore for PreferenceStorage {
    async fn set(&self, user_id: &str, key: &str, value: Value) -> engram_traits::Result<()> {
        self.set_value(user_id, key, &value).map_err(StoreError::from)
    }

    async fn get(&self, user_id: &str, key: &str) -> engram_traits::Result<Option<Value>> {
        self.get_value(user_id, key).map_err(StoreError::from)
    }

    async fn list_keys(&self, user_id: &str) -> engram_traits::Result<Vec<String>> {
        self.list_user_keys(user_id).map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn create_test_storage() -> PreferenceStorage {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        PreferenceStorage::new(db).unwrap()
    }

    #[test]
    fn test_set_and_get_value() {
        let storage = create_test_storage();

        storage
            .set_value("user-001", "management_style", &json!("data-driven decisions"))
            .unwrap();

        let value = storage.get_value("user-001", "management_style").unwrap();
        assert_eq!(value, Some(json!("data-driven decisions")));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let storage = create_test_storage();
        assert!(storage.get_value("user-001", "unknown").unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites() {
        let storage = create_test_storage();

        storage
            .set_value("user-001", "report_format", &json!("pdf"))
            .unwrap();
        storage
            .set_value("user-001", "report_format", &json!("markdown"))
            .unwrap();

        let value = storage.get_value("user-001", "report_format").unwrap();
        assert_eq!(value, Some(json!("markdown")));
    }

    #[test]
    fn test_list_user_keys_is_namespaced() {
        let storage = create_test_storage();

        storage.set_value("user-001", "a", &json!(1)).unwrap();
        storage.set_value("user-001", "b", &json!(2)).unwrap();
        storage.set_value("user-002", "c", &json!(3)).unwrap();

        let keys = storage.list_user_keys("user-001").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));

        assert_eq!(storage.list_user_keys("user-003").unwrap().len(), 0);
    }
}
