//! Working buffer - bounded per-session log of the current round's turns.
//!
//! Provides a sliding window over conversation turns with automatic eviction
//! of the oldest entry when the limit is reached. Unlike a plain history
//! window, evictions are returned to the caller: the coordinator decides
//! whether an evicted turn is folded into the round summary or archived, so
//! a lost eviction is a correctness bug rather than quiet data loss.

use std::collections::VecDeque;

use engram_models::{TurnRecord, TurnRole};

/// Default maximum number of turns in the working buffer
pub const DEFAULT_CAPACITY: usize = 20;

/// Bounded, ordered turn log for one session's current round.
///
/// # Design Decisions
///
/// - **Evictions are observable**: `append` returns the evicted record so the
///   caller can forward it for compaction or archival.
/// - **System turn preserved**: the first system turn is never evicted as it
///   carries the core instructions for the round.
/// - **Configurable limit**: different deployments may need different window
///   sizes.
#[derive(Debug, Clone)]
pub struct WorkingBuffer {
    /// Turns stored in order (oldest first)
    records: VecDeque<TurnRecord>,
    /// Maximum number of turns to retain
    capacity: usize,
    /// Approximate token count (estimated as chars / 4)
    token_count: usize,
}

impl Default for WorkingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl WorkingBuffer {
    /// Create a new working buffer with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            token_count: 0,
        }
    }

    /// Append a turn at the tail.
    ///
    /// If the buffer is at capacity, the oldest non-system turn is evicted
    /// first and returned for the caller to handle. The buffer length never
    /// exceeds the capacity.
    pub fn append(&mut self, record: TurnRecord) -> Option<TurnRecord> {
        let mut evicted = None;

        if self.records.len() >= self.capacity {
            evicted = self.remove_oldest_non_system();
            if evicted.is_none() {
                // All turns are system turns - rare edge case
                evicted = self.records.pop_front();
            }
            if let Some(removed) = evicted.as_ref() {
                self.token_count = self.token_count.saturating_sub(removed.estimate_tokens());
            }
        }

        self.token_count += record.estimate_tokens();
        self.records.push_back(record);
        evicted
    }

    /// Immutable ordered copy of the buffer contents.
    pub fn snapshot(&self) -> Vec<TurnRecord> {
        self.records.iter().cloned().collect()
    }

    /// Clear the buffer down to a single system turn.
    ///
    /// Used at round finalize so the next round starts from the instruction
    /// alone.
    pub fn reset(&mut self, system_prompt: &str) {
        self.records.clear();
        self.token_count = 0;
        let system = TurnRecord::system(system_prompt);
        self.token_count += system.estimate_tokens();
        self.records.push_back(system);
    }

    /// Number of turns currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Approximate token count of the buffered turns.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Turns that can still be added before eviction starts.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.records.len())
    }

    /// Up to `n` turns from the end (most recent).
    pub fn last_n(&self, n: usize) -> Vec<TurnRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records.iter().skip(start).cloned().collect()
    }

    /// Remove the oldest non-system turn.
    ///
    /// Returns the removed turn, or None if all turns are system turns.
    fn remove_oldest_non_system(&mut self) -> Option<TurnRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| !matches!(r.role, TurnRole::System));

        if let Some(idx) = idx {
            self.records.remove(idx)
        } else {
            None
        }
    }
}
