//! Round coordinator - per-session round lifecycle state machine.
//!
//! A round runs `Accumulating -> Finalizing -> (next round, Accumulating)`
//! for the life of the session. Turns accumulate in the working buffer;
//! finalize compacts the round into a summary, stores it in the short-term
//! cache, and resets the buffer.
//!
//! Finalize is atomic from the caller's perspective: the summary write is
//! retried with bounded backoff and the buffer is only reset after it
//! succeeds. A failed write leaves the round accumulating so nothing is
//! silently lost.
//!
//! Sessions are independent: each holds its own buffer, round counter and
//! phase behind a per-session lock, so transitions for one session are
//! strictly sequential while sessions never contend with each other.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use engram_models::{MemoryKind, RoundSummary, TurnRecord};

use crate::buffer::WorkingBuffer;
use crate::error::{MemoryError, Result};
use crate::stc::SummaryStore;

/// Lifecycle phase of a session's current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Accumulating,
    Finalizing,
}

/// Per-session state guarded by one lock.
#[derive(Debug)]
pub struct SessionState {
    pub buffer: WorkingBuffer,
    pub round: u64,
    pub phase: RoundPhase,
    pub memory_refs: BTreeSet<MemoryKind>,
}

/// Result of recording a turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Round the turn was recorded into
    pub round: u64,
    /// Record evicted to make room, to be forwarded for archival
    pub evicted: Option<TurnRecord>,
}

/// Orchestrates round lifecycles across sessions.
pub struct RoundCoordinator {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    summaries: Arc<dyn SummaryStore>,
    capacity: usize,
    system_prompt: String,
    write_retries: u32,
    write_backoff: Duration,
}

impl RoundCoordinator {
    pub fn new(
        summaries: Arc<dyn SummaryStore>,
        capacity: usize,
        system_prompt: String,
        write_retries: u32,
        write_backoff: Duration,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            summaries,
            capacity,
            system_prompt,
            write_retries: write_retries.max(1),
            write_backoff,
        }
    }

    fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                let mut buffer = WorkingBuffer::new(self.capacity);
                buffer.reset(&self.system_prompt);
                Arc::new(Mutex::new(SessionState {
                    buffer,
                    round: 1,
                    phase: RoundPhase::Accumulating,
                    memory_refs: BTreeSet::new(),
                }))
            })
            .clone()
    }

    /// Append a turn to the session's working buffer.
    pub async fn record_turn(&self, session_id: &str, record: TurnRecord) -> Result<TurnOutcome> {
        let session = self.session(session_id);
        let mut state = session.lock().await;

        let evicted = state.buffer.append(record);
        if evicted.is_some() {
            tracing::debug!(session = session_id, round = state.round, "buffer eviction");
        }

        Ok(TurnOutcome {
            round: state.round,
            evicted,
        })
    }

    /// Record which store kinds were touched while answering this round.
    pub async fn note_memory_use(
        &self,
        session_id: &str,
        kinds: impl IntoIterator<Item = MemoryKind>,
    ) {
        let session = self.session(session_id);
        let mut state = session.lock().await;
        state.memory_refs.extend(kinds);
    }

    /// Finalize the current round: summarize, store, reset.
    ///
    /// The buffer is never reset without a successfully stored summary; on
    /// write exhaustion the session stays accumulating and the error is
    /// returned so the caller can retry.
    pub async fn finalize_round(
        &self,
        session_id: &str,
        query: &str,
        answer: &str,
    ) -> Result<RoundSummary> {
        let session = self.session(session_id);
        let mut state = session.lock().await;
        state.phase = RoundPhase::Finalizing;

        let summary = RoundSummary::new(
            session_id.to_string(),
            state.round,
            query,
            answer,
            state.memory_refs.clone(),
        );

        let mut last_message = String::new();
        let mut stored = false;
        for attempt in 1..=self.write_retries {
            match self
                .summaries
                .store_summary(session_id, summary.clone())
                .await
            {
                Ok(()) => {
                    stored = true;
                    break;
                }
                Err(err) => {
                    last_message = err.to_string();
                    tracing::warn!(
                        session = session_id,
                        attempt,
                        error = %last_message,
                        "round summary write failed"
                    );
                    if attempt < self.write_retries {
                        tokio::time::sleep(self.write_backoff * attempt).await;
                    }
                }
            }
        }

        if !stored {
            // Atomicity: the round keeps accumulating until a summary lands
            state.phase = RoundPhase::Accumulating;
            return Err(MemoryError::StoreWrite {
                attempts: self.write_retries,
                message: last_message,
            });
        }

        state.buffer.reset(&self.system_prompt);
        state.round += 1;
        state.memory_refs.clear();
        state.phase = RoundPhase::Accumulating;

        tracing::info!(
            session = session_id,
            round = summary.round_id,
            "round finalized"
        );
        Ok(summary)
    }

    /// Immutable copy of the session's buffer contents.
    pub async fn snapshot(&self, session_id: &str) -> Vec<TurnRecord> {
        let session = self.session(session_id);
        let state = session.lock().await;
        state.buffer.snapshot()
    }

    /// The session's current round counter.
    pub async fn round(&self, session_id: &str) -> u64 {
        let session = self.session(session_id);
        let state = session.lock().await;
        state.round
    }

    /// Drop all per-session state. Returns whether the session existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stc::ShortTermCache;
    use async_trait::async_trait;
    use engram_traits::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingSummaryStore {
        failures_remaining: AtomicU32,
        inner: ShortTermCache,
    }

    impl FailingSummaryStore {
        fn new(failures: u32) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failures),
                inner: ShortTermCache::new(Duration::from_secs(1800)),
            }
        }
    }

    #[async_trait]
    impl SummaryStore for FailingSummaryStore {
        async fn store_summary(
            &self,
            session_id: &str,
            summary: RoundSummary,
        ) -> std::result::Result<(), StoreError> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Backend("cache offline".to_string()));
            }
            self.inner.store_summary(session_id, summary).await
        }

        async fn retrieve_summaries(
            &self,
            session_id: &str,
            last_k: usize,
        ) -> std::result::Result<Vec<RoundSummary>, StoreError> {
            self.inner.retrieve_summaries(session_id, last_k).await
        }

        async fn purge_expired(&self) -> std::result::Result<usize, StoreError> {
            self.inner.purge_expired().await
        }

        async fn clear_session(&self, session_id: &str) -> std::result::Result<(), StoreError> {
            self.inner.clear_session(session_id).await
        }
    }

    fn coordinator(store: Arc<dyn SummaryStore>) -> RoundCoordinator {
        RoundCoordinator::new(
            store,
            5,
            "You are a helpful assistant.".to_string(),
            2,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_round_cycle() {
        let stc = Arc::new(ShortTermCache::new(Duration::from_secs(1800)));
        let coordinator = coordinator(stc.clone());

        coordinator
            .record_turn("s1", TurnRecord::user("book a flight"))
            .await
            .unwrap();
        coordinator
            .record_turn("s1", TurnRecord::assistant("done, CA1846"))
            .await
            .unwrap();
        coordinator
            .note_memory_use("s1", [MemoryKind::Episodic])
            .await;

        let summary = coordinator
            .finalize_round("s1", "book a flight", "done, CA1846")
            .await
            .unwrap();
        assert_eq!(summary.round_id, 1);
        assert!(summary.memory_refs.contains(&MemoryKind::Episodic));

        // Buffer reset to the system turn, round advanced
        let snapshot = coordinator.snapshot("s1").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(coordinator.round("s1").await, 2);

        let stored = stc.retrieve_summaries("s1", 10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_is_atomic_on_write_failure() {
        let store = Arc::new(FailingSummaryStore::new(10));
        let coordinator = coordinator(store.clone());

        coordinator
            .record_turn("s1", TurnRecord::user("important question"))
            .await
            .unwrap();

        let err = coordinator
            .finalize_round("s1", "important question", "answer")
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::StoreWrite { .. }));

        // Buffer NOT reset, round NOT advanced
        let snapshot = coordinator.snapshot("s1").await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(coordinator.round("s1").await, 1);
    }

    #[tokio::test]
    async fn test_finalize_retries_through_transient_failure() {
        let store = Arc::new(FailingSummaryStore::new(1));
        let coordinator = coordinator(store.clone());

        coordinator
            .record_turn("s1", TurnRecord::user("q"))
            .await
            .unwrap();

        coordinator.finalize_round("s1", "q", "a").await.unwrap();
        assert_eq!(coordinator.round("s1").await, 2);
        assert_eq!(store.retrieve_summaries("s1", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evictions_are_forwarded() {
        let stc = Arc::new(ShortTermCache::new(Duration::from_secs(1800)));
        let coordinator = coordinator(stc);

        let mut evictions = Vec::new();
        for i in 0..8 {
            let outcome = coordinator
                .record_turn("s1", TurnRecord::user(format!("turn {}", i)))
                .await
                .unwrap();
            if let Some(evicted) = outcome.evicted {
                evictions.push(evicted);
            }
        }

        // Capacity 5 with one reserved system turn: 4 user slots
        assert_eq!(evictions.len(), 4);
        assert_eq!(evictions[0].content, "turn 0");
        assert_eq!(coordinator.snapshot("s1").await.len(), 5);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let stc = Arc::new(ShortTermCache::new(Duration::from_secs(1800)));
        let coordinator = coordinator(stc);

        coordinator
            .record_turn("s1", TurnRecord::user("a"))
            .await
            .unwrap();
        coordinator
            .record_turn("s2", TurnRecord::user("b"))
            .await
            .unwrap();
        coordinator.finalize_round("s1", "a", "done").await.unwrap();

        assert_eq!(coordinator.round("s1").await, 2);
        assert_eq!(coordinator.round("s2").await, 1);

        assert!(coordinator.end_session("s1"));
        assert!(!coordinator.end_session("s1"));
        assert_eq!(coordinator.session_count(), 1);
    }
}
