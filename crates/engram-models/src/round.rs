//! Round summaries - the unit stored in the short-term cache.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::item::MemoryKind;
use crate::time_utils;

/// Maximum digest length in characters before truncation
pub const DIGEST_MAX_CHARS: usize = 200;

/// Compacted record of one query-to-answer round.
///
/// Written once per round at finalize time, read many times when assembling
/// context for later rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSummary {
    pub round_id: u64,
    pub session_id: String,
    /// Bounded digest of the round's user query
    pub query_digest: String,
    /// Bounded digest of the round's final answer
    pub answer_digest: String,
    /// Store kinds touched while answering this round
    #[serde(default)]
    pub memory_refs: BTreeSet<MemoryKind>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl RoundSummary {
    /// Build a summary for a finished round, digesting query and answer.
    pub fn new(
        session_id: String,
        round_id: u64,
        query: &str,
        answer: &str,
        memory_refs: BTreeSet<MemoryKind>,
    ) -> Self {
        Self {
            round_id,
            session_id,
            query_digest: digest(query, DIGEST_MAX_CHARS),
            answer_digest: digest(answer, DIGEST_MAX_CHARS),
            memory_refs,
            timestamp: time_utils::now_ms(),
        }
    }

    /// Render the summary as one compact context line.
    pub fn render(&self) -> String {
        let mut line = format!(
            "[round {}] Q: {} | A: {}",
            self.round_id, self.query_digest, self.answer_digest
        );
        if !self.memory_refs.is_empty() {
            let refs: Vec<&str> = self.memory_refs.iter().map(MemoryKind::as_str).collect();
            line.push_str(&format!(" | memory: {}", refs.join(", ")));
        }
        line
    }
}

/// Truncate `text` to at most `max_chars` characters, appending an ellipsis.
///
/// Truncation happens on a char boundary so multi-byte content stays valid.
pub fn digest(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
