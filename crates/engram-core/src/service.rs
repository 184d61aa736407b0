//! Memory service - the facade callers interact with.
//!
//! Wires the classifier, router, coordinator, cache and assembler together
//! behind the operations the reasoning loop consumes: `classify`,
//! `record_turn`, `finalize_round`, `build_context`, `dedupe_check`,
//! `dedupe_record`, plus recall and session maintenance.
//!
//! Propagation policy: classification and archival faults are isolated from
//! the reasoning turn. `record_turn` only fails on internal invariant
//! violations, never because a capability or store misbehaved; the agent
//! proceeds with reduced context richness instead.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use engram_models::{
    ClassificationResult, RelationTriple, RoundSummary, TurnRecord, TurnRole, VectorPartition,
};
use engram_traits::{
    DeepAnalyzer, EmbeddingProvider, LightScorer, RelationStore, VectorMatch, VectorStore,
};

use crate::assembler::ContextAssembler;
use crate::classifier::{FunnelStats, SessionContext, ValueClassifier};
use crate::config::MemoryConfig;
use crate::coordinator::RoundCoordinator;
use crate::dedupe::ActionDedupeCache;
use crate::error::Result;
use crate::router::{MemoryRouter, StoreSet};
use crate::stc::{ShortTermCache, SummaryStore};

/// The tiered memory manager.
pub struct MemoryService {
    config: MemoryConfig,
    classifier: ValueClassifier,
    router: MemoryRouter,
    coordinator: RoundCoordinator,
    stc: Arc<ShortTermCache>,
    assembler: ContextAssembler,
    dedupe: DashMap<String, Arc<ActionDedupeCache>>,
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    relations: Arc<dyn RelationStore>,
}

impl MemoryService {
    /// Build a service over explicit store handles and capabilities.
    pub fn new(
        stores: StoreSet,
        embedder: Arc<dyn EmbeddingProvider>,
        scorer: Arc<dyn LightScorer>,
        analyzer: Arc<dyn DeepAnalyzer>,
        config: MemoryConfig,
    ) -> Self {
        let stc = Arc::new(ShortTermCache::new(config.summary_ttl));
        let classifier = ValueClassifier::new(
            scorer,
            analyzer,
            config.light_timeout,
            config.deep_timeout,
            config.light_confidence_threshold,
        );
        let router = MemoryRouter::new(
            stores.clone(),
            embedder.clone(),
            config.store_write_retries,
            config.store_retry_backoff,
        );
        let coordinator = RoundCoordinator::new(
            stc.clone() as Arc<dyn SummaryStore>,
            config.working_capacity,
            config.system_prompt.clone(),
            config.store_write_retries,
            config.store_retry_backoff,
        );
        let assembler = ContextAssembler::new(
            config.summary_last_k,
            config.working_capacity,
            config.system_prompt.clone(),
        );

        Self {
            classifier,
            router,
            coordinator,
            stc,
            assembler,
            dedupe: DashMap::new(),
            embedder,
            vectors: stores.vectors.clone(),
            relations: stores.relations.clone(),
            config,
        }
    }

    /// Run the value funnel over an input without persisting anything.
    pub async fn classify(&self, input: &str, ctx: &SessionContext) -> ClassificationResult {
        self.classifier.classify(input, ctx).await
    }

    /// Record a turn into the session's working buffer.
    ///
    /// User turns additionally ride through classification and store routing;
    /// evicted turns are offered to the archival path. Neither concern can
    /// fail the call.
    pub async fn record_turn(&self, session_id: &str, record: TurnRecord) -> Result<()> {
        let ctx = SessionContext::for_session(session_id);
        let is_user_turn = matches!(record.role, TurnRole::User);
        let content = record.content.clone();

        let outcome = self.coordinator.record_turn(session_id, record).await?;

        if let Some(evicted) = outcome.evicted {
            match self
                .router
                .archive_overflow(&ctx, outcome.round, &evicted)
                .await
            {
                Ok(true) => {
                    tracing::debug!(session = session_id, "evicted turn archived as episodic");
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(session = session_id, error = %err, "eviction lost");
                }
            }
        }

        if is_user_turn {
            let verdict = self.classifier.classify(&content, &ctx).await;
            tracing::debug!(
                session = session_id,
                level = verdict.level.as_u8(),
                stage = ?verdict.stage,
                confidence = verdict.confidence,
                "input classified"
            );
            match self
                .router
                .route(&content, &verdict, &ctx, outcome.round)
                .await
            {
                Ok(written) if !written.is_empty() => {
                    self.coordinator.note_memory_use(session_id, written).await;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(session = session_id, error = %err, "memory write dropped");
                }
            }
        }

        Ok(())
    }

    /// Finalize the session's current round.
    pub async fn finalize_round(
        &self,
        session_id: &str,
        query: &str,
        answer: &str,
    ) -> Result<RoundSummary> {
        self.coordinator.finalize_round(session_id, query, answer).await
    }

    /// Build the bounded context for the session's next decision cycle.
    pub async fn build_context(&self, session_id: &str) -> Result<Vec<TurnRecord>> {
        let summaries = self
            .stc
            .retrieve_summaries(session_id, self.config.summary_last_k)
            .await?;
        let snapshot = self.coordinator.snapshot(session_id).await;
        Ok(self.assembler.build(&summaries, &snapshot))
    }

    /// Check whether a side-effecting operation already ran this session.
    pub fn dedupe_check(&self, session_id: &str, op_name: &str, args: &Value) -> (bool, Option<Value>) {
        self.session_dedupe(session_id).should_skip(op_name, args)
    }

    /// Record a completed side-effecting operation.
    pub fn dedupe_record(&self, session_id: &str, op_name: &str, args: &Value, result: Value) {
        self.session_dedupe(session_id).record(op_name, args, result);
    }

    /// Nearest-neighbor recall from one vector partition.
    pub async fn recall(
        &self,
        partition: VectorPartition,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<VectorMatch>> {
        let normalized = self.embedder.normalize_text(query_text);
        let embedding = self.embedder.embed(&normalized).await?;
        let top_k = top_k.unwrap_or(self.config.recall_top_k);
        Ok(self.vectors.search(partition, &embedding, top_k).await?)
    }

    /// Relations for a subject, falling back to keyword search when the
    /// exact subject is unknown.
    pub async fn recall_relations(&self, subject: &str) -> Result<Vec<RelationTriple>> {
        let exact = self.relations.related(subject).await?;
        if !exact.is_empty() {
            return Ok(exact);
        }

        for keyword in subject.split_whitespace().filter(|w| w.chars().count() > 1) {
            let hits = self.relations.related_fuzzy(keyword, 3).await?;
            if !hits.is_empty() {
                tracing::debug!(keyword, "relation lookup resolved via keyword");
                return Ok(hits);
            }
        }
        Ok(Vec::new())
    }

    /// Drop all per-session state: buffer, round counter, summaries, dedupe.
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        self.coordinator.end_session(session_id);
        self.dedupe.remove(session_id);
        self.stc.clear_session(session_id).await?;
        Ok(())
    }

    /// Sweep expired round summaries. Returns the number removed.
    pub async fn purge_expired_summaries(&self) -> Result<usize> {
        Ok(self.stc.purge_expired().await?)
    }

    /// Funnel throughput statistics.
    pub fn funnel_stats(&self) -> FunnelStats {
        self.classifier.stats()
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn session_dedupe(&self, session_id: &str) -> Arc<ActionDedupeCache> {
        self.dedupe
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(ActionDedupeCache::new()))
            .clone()
    }
}
