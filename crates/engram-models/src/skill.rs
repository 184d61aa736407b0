//! Skill records - procedural memory entries.

use serde::{Deserialize, Serialize};

use crate::time_utils;

/// A named executable procedure stored in the skill registry.
///
/// Records are content-addressed: `content_hash` covers the body so the same
/// procedure is never stored twice under different ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillRecord {
    /// Lookup name, unique within the registry
    pub name: String,
    /// Short human-readable description
    #[serde(default)]
    pub description: String,
    /// The procedure body (code or normalized step description)
    pub body: String,
    /// SHA-256 hash of the body
    pub content_hash: String,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl SkillRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>, body: String) -> Self {
        let content_hash = crate::item::content_hash(&body);
        Self {
            name: name.into(),
            description: description.into(),
            body,
            content_hash,
            created_at: time_utils::now_ms(),
        }
    }
}
