//! Memory router - writes classification verdicts into long-term stores.
//!
//! Routing policy: level 1 discards; level 2 -> vector store (episodic);
//! level 3 -> structured store keyed by user and extraction key; level 4 ->
//! skill registry; level 5 -> vector store (semantic). A relation extraction
//! is written to the relation store in addition to the level-routed write.
//!
//! Writes are retried with bounded linear backoff; on exhaustion the item is
//! dropped and the failure is surfaced as a warning, never propagated as a
//! fatal error to the reasoning loop.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use engram_models::{
    ClassificationResult, ExtractedPayload, MemoryItem, MemoryKind, MemoryLevel, Provenance,
    RelationTriple, SkillRecord, TurnRecord, TurnRole, VectorPartition,
};
use engram_traits::{
    EmbeddingProvider, RelationStore, SkillRegistry, StructuredStore, VectorStore,
};

use crate::classifier::{SessionContext, rules};
use crate::error::{MemoryError, Result};

/// The four shared long-term store handles.
///
/// Passed explicitly rather than reached through ambient globals so tests can
/// wire in-memory fakes.
#[derive(Clone)]
pub struct StoreSet {
    pub structured: Arc<dyn StructuredStore>,
    pub relations: Arc<dyn RelationStore>,
    pub vectors: Arc<dyn VectorStore>,
    pub skills: Arc<dyn SkillRegistry>,
}

/// Routes classified input into the appropriate long-term store.
pub struct MemoryRouter {
    stores: StoreSet,
    embedder: Arc<dyn EmbeddingProvider>,
    retries: u32,
    backoff: Duration,
}

impl MemoryRouter {
    pub fn new(
        stores: StoreSet,
        embedder: Arc<dyn EmbeddingProvider>,
        retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            stores,
            embedder,
            retries: retries.max(1),
            backoff,
        }
    }

    /// Persist a classification verdict. Returns the set of store kinds
    /// written (empty for discards).
    pub async fn route(
        &self,
        input: &str,
        result: &ClassificationResult,
        ctx: &SessionContext,
        round: u64,
    ) -> Result<BTreeSet<MemoryKind>> {
        let mut written = BTreeSet::new();

        match result.level {
            MemoryLevel::Discard => {}
            MemoryLevel::Episodic => {
                self.write_vector(VectorPartition::Episodic, MemoryKind::Episodic, input, ctx, round)
                    .await?;
                written.insert(MemoryKind::Episodic);
            }
            MemoryLevel::Preference => {
                let (key, value) = match &result.extracted {
                    Some(ExtractedPayload::Preference { key, value }) => {
                        (key.clone(), value.clone())
                    }
                    _ => (derived_key("pref", input), input.to_string()),
                };
                let structured = self.stores.structured.clone();
                let user_id = ctx.user_id.clone();
                self.retry_write("preference", || {
                    let structured = structured.clone();
                    let user_id = user_id.clone();
                    let key = key.clone();
                    let value = json!(value.clone());
                    async move { structured.set(&user_id, &key, value).await }
                })
                .await?;
                written.insert(MemoryKind::Preference);
            }
            MemoryLevel::Procedural => {
                let (name, body) = match &result.extracted {
                    Some(ExtractedPayload::Procedure { name, description }) => {
                        (name.clone(), description.clone())
                    }
                    _ => (derived_key("proc", input), input.to_string()),
                };
                let record = SkillRecord::new(name, "captured from conversation", body);
                let skills = self.stores.skills.clone();
                self.retry_write("skill", || {
                    let skills = skills.clone();
                    let record = record.clone();
                    async move { skills.put(record).await }
                })
                .await?;
                written.insert(MemoryKind::Procedural);
            }
            MemoryLevel::Semantic => {
                let text = match &result.extracted {
                    Some(ExtractedPayload::Fact { text }) => text.as_str(),
                    _ => input,
                };
                self.write_vector(VectorPartition::Semantic, MemoryKind::Semantic, text, ctx, round)
                    .await?;
                written.insert(MemoryKind::Semantic);
            }
        }

        // A relation extraction is durable regardless of the primary route
        if let Some(ExtractedPayload::Relation {
            subject,
            relation,
            object,
        }) = &result.extracted
        {
            let triple = RelationTriple::new(subject.clone(), relation.clone(), object.clone());
            let relations = self.stores.relations.clone();
            self.retry_write("relation", || {
                let relations = relations.clone();
                let triple = triple.clone();
                async move { relations.add(triple).await }
            })
            .await?;
            written.insert(MemoryKind::Relation);
        }

        Ok(written)
    }

    /// Archive a turn evicted from the working buffer.
    ///
    /// Raw turns are never written to the short-term cache; a turn that the
    /// fast rules would discard is simply folded into the eventual round
    /// summary, otherwise it is preserved as episodic memory. Returns whether
    /// the turn was archived.
    pub async fn archive_overflow(
        &self,
        ctx: &SessionContext,
        round: u64,
        record: &TurnRecord,
    ) -> Result<bool> {
        if !matches!(record.role, TurnRole::User | TurnRole::Assistant) {
            return Ok(false);
        }
        if rules::matches_discard(&record.content).is_some() {
            return Ok(false);
        }

        self.write_overflow_vector(&record.content, ctx, round)
            .await
            .map_err(|err| MemoryError::BufferOverflowLostWrite(err.to_string()))?;
        Ok(true)
    }

    async fn write_vector(
        &self,
        partition: VectorPartition,
        kind: MemoryKind,
        text: &str,
        ctx: &SessionContext,
        round: u64,
    ) -> Result<()> {
        let provenance = Provenance {
            session_id: Some(ctx.session_id.clone()),
            round,
            source: "classifier".to_string(),
        };
        self.embed_and_insert(partition, kind, text, provenance).await
    }

    async fn write_overflow_vector(
        &self,
        text: &str,
        ctx: &SessionContext,
        round: u64,
    ) -> Result<()> {
        let provenance = Provenance {
            session_id: Some(ctx.session_id.clone()),
            round,
            source: "overflow_archive".to_string(),
        };
        self.embed_and_insert(VectorPartition::Episodic, MemoryKind::Episodic, text, provenance)
            .await
    }

    async fn embed_and_insert(
        &self,
        partition: VectorPartition,
        kind: MemoryKind,
        text: &str,
        provenance: Provenance,
    ) -> Result<()> {
        let embedder = self.embedder.clone();
        let vectors = self.stores.vectors.clone();
        let normalized = embedder.normalize_text(text);
        let payload = text.to_string();

        self.retry_write(partition.as_str(), || {
            let embedder = embedder.clone();
            let vectors = vectors.clone();
            let normalized = normalized.clone();
            let payload = payload.clone();
            let provenance = provenance.clone();
            async move {
                let embedding = embedder.embed(&normalized).await?;
                let item = MemoryItem::new(kind, payload)
                    .with_embedding(embedding)
                    .with_provenance(provenance);
                vectors.insert(partition, item).await
            }
        })
        .await?;
        Ok(())
    }

    /// Run a store write with bounded retries and linear backoff.
    async fn retry_write<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = engram_traits::Result<T>>,
    {
        let mut last_message = String::new();
        for attempt in 1..=self.retries {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_message = err.to_string();
                    tracing::warn!(op, attempt, error = %last_message, "store write failed");
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        Err(MemoryError::StoreWrite {
            attempts: self.retries,
            message: last_message,
        })
    }
}

/// Stable fallback key for payloads the funnel produced no extraction for.
fn derived_key(prefix: &str, input: &str) -> String {
    format!("{}-{}", prefix, &engram_models::content_hash(input)[..12])
}
