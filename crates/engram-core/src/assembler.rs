//! Context assembler - merges cached summaries and the working buffer into
//! one bounded context for the next decision cycle.
//!
//! Output shape: one system instruction record, then up to `last_k` summary
//! digest records, then the tail of the working buffer. The total length is
//! bounded by `1 + last_k + (C - 1)` records by construction, independent of
//! session history length. Building is a pure function of the inputs.

use engram_models::{RoundSummary, TurnRecord, TurnRole};

/// Assembles bounded prompt context from memory state.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    last_k: usize,
    capacity: usize,
    system_prompt: String,
}

impl ContextAssembler {
    pub fn new(last_k: usize, capacity: usize, system_prompt: String) -> Self {
        Self {
            last_k,
            capacity,
            system_prompt,
        }
    }

    /// Upper bound on the number of records `build` can return.
    pub fn max_len(&self) -> usize {
        1 + self.last_k + self.capacity.saturating_sub(1)
    }

    /// Compose the context from retrieved summaries and a buffer snapshot.
    ///
    /// The buffer's own system record is dropped in favor of the single
    /// instruction record at the head; the buffer contributes at most its
    /// last `C - 1` conversational turns.
    pub fn build(&self, summaries: &[RoundSummary], snapshot: &[TurnRecord]) -> Vec<TurnRecord> {
        let mut context = Vec::with_capacity(self.max_len());
        context.push(TurnRecord::system(&self.system_prompt));

        let summary_start = summaries.len().saturating_sub(self.last_k);
        for summary in &summaries[summary_start..] {
            context.push(TurnRecord::system(summary.render()));
        }

        let turns: Vec<&TurnRecord> = snapshot
            .iter()
            .filter(|r| !matches!(r.role, TurnRole::System))
            .collect();
        let turn_start = turns.len().saturating_sub(self.capacity.saturating_sub(1));
        context.extend(turns[turn_start..].iter().map(|r| (*r).clone()));

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn summary(round: u64) -> RoundSummary {
        RoundSummary::new(
            "s1".to_string(),
            round,
            &format!("query {}", round),
            &format!("answer {}", round),
            BTreeSet::new(),
        )
    }

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(15, 20, "You are a helpful assistant.".to_string())
    }

    #[test]
    fn test_shape_system_then_summaries_then_turns() {
        let assembler = assembler();
        let summaries = vec![summary(1), summary(2)];
        let snapshot = vec![
            TurnRecord::system("buffer system"),
            TurnRecord::user("current question"),
        ];

        let context = assembler.build(&summaries, &snapshot);

        assert_eq!(context.len(), 4);
        assert_eq!(context[0].content, "You are a helpful assistant.");
        assert!(context[1].content.starts_with("[round 1]"));
        assert!(context[2].content.starts_with("[round 2]"));
        assert_eq!(context[3].content, "current question");
    }

    #[test]
    fn test_bound_holds_for_any_history_length() {
        let assembler = assembler();

        let summaries: Vec<RoundSummary> = (1..=200).map(summary).collect();
        let snapshot: Vec<TurnRecord> = (0..200)
            .map(|i| TurnRecord::user(format!("turn {}", i)))
            .collect();

        let context = assembler.build(&summaries, &snapshot);
        assert!(context.len() <= assembler.max_len());
        assert_eq!(context.len(), 1 + 15 + 19);

        // Most recent entries win on both sides
        assert!(context[15].content.starts_with("[round 200]"));
        assert_eq!(context.last().unwrap().content, "turn 199");
    }

    #[test]
    fn test_empty_state_yields_instruction_only() {
        let assembler = assembler();
        let context = assembler.build(&[], &[]);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].role, TurnRole::System);
    }

    #[test]
    fn test_buffer_system_record_not_duplicated() {
        let assembler = assembler();
        let snapshot = vec![
            TurnRecord::system("buffer instruction"),
            TurnRecord::user("hello"),
        ];

        let context = assembler.build(&[], &snapshot);
        let system_count = context
            .iter()
            .filter(|r| matches!(r.role, TurnRole::System))
            .count();
        assert_eq!(system_count, 1);
    }
}
