//! Classification capability traits backing the value funnel.
//!
//! Both stages are injected, potentially model-backed and non-deterministic.
//! The funnel bounds every call with a timeout and degrades on failure, so
//! implementations are free to be slow or occasionally unavailable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use engram_models::{ExtractedPayload, MemoryLevel};

use crate::error::Result;

/// Coarse verdict from the light scoring stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightScore {
    pub level: MemoryLevel,
    /// Confidence in [0, 1]; the funnel escalates below its threshold
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

/// Rich verdict from the deep analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeepAnalysis {
    pub level: MemoryLevel,
    pub confidence: f32,
    /// Normalized payload persisted in place of the raw input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedPayload>,
    #[serde(default)]
    pub reasoning: String,
}

/// Lightweight scoring capability (keyword heuristic or small model call).
#[async_trait]
pub trait LightScorer: Send + Sync {
    async fn score(&self, input: &str, user_id: &str) -> Result<LightScore>;
}

/// Deep analysis capability returning a richer classification plus an
/// extracted structured payload.
#[async_trait]
pub trait DeepAnalyzer: Send + Sync {
    async fn analyze(&self, input: &str, user_id: &str) -> Result<DeepAnalysis>;
}
