//! Action dedupe cache - remembers side-effecting operations already
//! performed in the current task.
//!
//! The cache is session-scoped and must be reset on session end; carrying it
//! across sessions would replay stale results.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use engram_models::{ActionSignature, CachedAction};

/// Per-session cache of completed operations keyed by argument signature.
#[derive(Debug, Default)]
pub struct ActionDedupeCache {
    actions: RwLock<HashMap<ActionSignature, CachedAction>>,
}

impl ActionDedupeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `(op_name, args)` already ran.
    ///
    /// Returns `(true, cached_result)` on a hit; the caller must not
    /// re-execute the operation.
    pub fn should_skip(&self, op_name: &str, args: &Value) -> (bool, Option<Value>) {
        let signature = ActionSignature::compute(op_name, args);
        match self.actions.read().get(&signature) {
            Some(cached) => {
                tracing::debug!(op = op_name, "duplicate operation, using cached result");
                (true, Some(cached.result.clone()))
            }
            None => (false, None),
        }
    }

    /// Record a completed operation's outcome.
    pub fn record(&self, op_name: &str, args: &Value, result: Value) {
        let signature = ActionSignature::compute(op_name, args);
        self.actions
            .write()
            .insert(signature, CachedAction::new(op_name, result));
    }

    /// Forget everything. Called on session end.
    pub fn reset(&self) {
        self.actions.write().clear();
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.read().is_empty()
    }
}
