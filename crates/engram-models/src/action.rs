//! Action signatures for side-effect deduplication.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time_utils;

/// Hash identity of a side-effecting operation.
///
/// Two calls with the same operation name and equal arguments produce the
/// same signature. serde_json maps serialize with sorted keys, so the JSON
/// rendering of the arguments is canonical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionSignature(String);

impl ActionSignature {
    /// Compute the signature over `(operation_name, arguments)`.
    pub fn compute(op_name: &str, args: &Value) -> Self {
        use sha2::{Digest, Sha256};

        let canonical = format!("{}|{}", op_name, args);
        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        Self(hash[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A cached operation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedAction {
    pub op_name: String,
    pub result: Value,
    /// Unix timestamp in milliseconds when the operation completed
    pub recorded_at: i64,
}

impl CachedAction {
    pub fn new(op_name: impl Into<String>, result: Value) -> Self {
        Self {
            op_name: op_name.into(),
            result,
            recorded_at: time_utils::now_ms(),
        }
    }
}
