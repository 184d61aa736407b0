//! Short-term cache - TTL-bounded store of compacted round summaries.
//!
//! Summaries are kept per session and expire after a configurable lifetime.
//! Expiry is enforced at read time regardless of sweep cadence; an explicit
//! idempotent purge is available for maintenance.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use engram_models::{RoundSummary, now_ms};
use engram_traits::StoreError;

/// Storage adapter for round summaries.
///
/// The in-memory [`ShortTermCache`] is the default implementation; the
/// coordinator only depends on this trait so finalize semantics can be
/// exercised against failing stores.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Upsert the summary for `(session, round)`.
    async fn store_summary(
        &self,
        session_id: &str,
        summary: RoundSummary,
    ) -> Result<(), StoreError>;

    /// The `last_k` most recent non-expired summaries, oldest first.
    /// Unknown sessions yield an empty vec, never an error.
    async fn retrieve_summaries(
        &self,
        session_id: &str,
        last_k: usize,
    ) -> Result<Vec<RoundSummary>, StoreError>;

    /// Drop expired entries. Idempotent and safe to call concurrently.
    async fn purge_expired(&self) -> Result<usize, StoreError>;

    /// Drop every summary for a session.
    async fn clear_session(&self, session_id: &str) -> Result<(), StoreError>;
}

/// TTL-based in-memory summary cache keyed by session.
#[derive(Debug)]
pub struct ShortTermCache {
    sessions: RwLock<HashMap<String, Vec<RoundSummary>>>,
    ttl: Duration,
}

impl ShortTermCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, summary: &RoundSummary, now: i64) -> bool {
        now.saturating_sub(summary.timestamp) > self.ttl.as_millis() as i64
    }

    /// Number of sessions currently holding summaries.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SummaryStore for ShortTermCache {
    async fn store_summary(
        &self,
        session_id: &str,
        summary: RoundSummary,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let entries = sessions.entry(session_id.to_string()).or_default();

        match entries.iter_mut().find(|s| s.round_id == summary.round_id) {
            Some(existing) => *existing = summary,
            None => {
                entries.push(summary);
                entries.sort_by_key(|s| s.round_id);
            }
        }
        Ok(())
    }

    async fn retrieve_summaries(
        &self,
        session_id: &str,
        last_k: usize,
    ) -> Result<Vec<RoundSummary>, StoreError> {
        let now = now_ms();
        let sessions = self.sessions.read().await;

        let Some(entries) = sessions.get(session_id) else {
            return Ok(Vec::new());
        };

        let live: Vec<RoundSummary> = entries
            .iter()
            .filter(|s| !self.is_expired(s, now))
            .cloned()
            .collect();

        let start = live.len().saturating_sub(last_k);
        Ok(live[start..].to_vec())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = now_ms();
        let mut sessions = self.sessions.write().await;

        let mut removed = 0usize;
        sessions.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|s| {
                now.saturating_sub(s.timestamp) <= self.ttl.as_millis() as i64
            });
            removed += before - entries.len();
            !entries.is_empty()
        });

        if removed > 0 {
            tracing::debug!("purged {} expired round summaries", removed);
        }
        Ok(removed)
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}
