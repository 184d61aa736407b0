//! Value classifier - the 3-stage escalation funnel.
//!
//! Decides an input's storage disposition by escalating through increasingly
//! expensive stages:
//!
//! 1. **Fast rule stage** - deterministic pattern match, resolves the bulk of
//!    inputs in microseconds with no external call.
//! 2. **Light scoring stage** - injected coarse scoring capability; accepted
//!    when its confidence clears the configured threshold.
//! 3. **Deep analysis stage** - injected rich analysis returning a normalized
//!    payload to persist in place of the raw input.
//!
//! Escalation is strictly monotonic. Every external call is bounded by a
//! timeout; on timeout or capability failure the funnel falls back to the
//! last successfully completed stage, degrading toward "store as generic
//! episodic" rather than failing the turn. Worst-case latency is the sum of
//! the per-stage timeouts.

pub mod rules;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::timeout;

use engram_models::{ClassificationResult, FilterStage, MemoryLevel};
use engram_traits::{DeepAnalyzer, LightScorer};

/// Session context handed to the scoring capabilities.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: String,
}

impl SessionContext {
    /// Context for a session whose user shares the session identifier.
    pub fn for_session(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            user_id: session_id.clone(),
            session_id,
        }
    }
}

/// Funnel throughput counters.
#[derive(Debug, Default)]
struct FunnelCounters {
    total: AtomicU64,
    fast_rule: AtomicU64,
    light_score: AtomicU64,
    deep_analysis: AtomicU64,
    degraded: AtomicU64,
}

/// Snapshot of funnel statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelStats {
    pub total: u64,
    pub fast_rule: u64,
    pub light_score: u64,
    pub deep_analysis: u64,
    /// Inputs resolved via a fallback after a timeout or capability error
    pub degraded: u64,
}

/// The 3-stage conversation-value funnel.
pub struct ValueClassifier {
    scorer: Arc<dyn LightScorer>,
    analyzer: Arc<dyn DeepAnalyzer>,
    light_timeout: Duration,
    deep_timeout: Duration,
    light_confidence_threshold: f32,
    counters: FunnelCounters,
}

impl ValueClassifier {
    pub fn new(
        scorer: Arc<dyn LightScorer>,
        analyzer: Arc<dyn DeepAnalyzer>,
        light_timeout: Duration,
        deep_timeout: Duration,
        light_confidence_threshold: f32,
    ) -> Self {
        Self {
            scorer,
            analyzer,
            light_timeout,
            deep_timeout,
            light_confidence_threshold,
            counters: FunnelCounters::default(),
        }
    }

    /// Run the funnel over one input.
    ///
    /// Never fails: degraded verdicts are still verdicts. A classification
    /// fault must not abort the reasoning turn it rides along with.
    pub async fn classify(&self, input: &str, ctx: &SessionContext) -> ClassificationResult {
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        // Stage 1: fast rules
        if let Some(label) = rules::matches_discard(input) {
            self.counters.fast_rule.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(session = %ctx.session_id, label, "fast rule discard");
            return ClassificationResult::discard(format!("matched rule: {}", label));
        }

        // Stage 2: light scoring
        let mut last_good: Option<ClassificationResult> = None;
        match timeout(self.light_timeout, self.scorer.score(input, &ctx.user_id)).await {
            Ok(Ok(score)) => {
                let result = ClassificationResult {
                    level: score.level,
                    stage: FilterStage::LightScore,
                    confidence: score.confidence,
                    extracted: None,
                    reasoning: score.reasoning,
                };
                let in_light_band =
                    matches!(score.level, MemoryLevel::Episodic | MemoryLevel::Preference);
                if in_light_band && score.confidence >= self.light_confidence_threshold {
                    self.counters.light_score.fetch_add(1, Ordering::Relaxed);
                    return result;
                }
                last_good = Some(result);
            }
            Ok(Err(err)) => {
                tracing::warn!(session = %ctx.session_id, error = %err, "light scorer failed");
            }
            Err(_) => {
                tracing::warn!(
                    session = %ctx.session_id,
                    timeout_ms = self.light_timeout.as_millis() as u64,
                    "light scorer timed out"
                );
            }
        }

        // Stage 3: deep analysis
        match timeout(self.deep_timeout, self.analyzer.analyze(input, &ctx.user_id)).await {
            Ok(Ok(analysis)) => {
                self.counters.deep_analysis.fetch_add(1, Ordering::Relaxed);
                ClassificationResult {
                    level: analysis.level,
                    stage: FilterStage::DeepAnalysis,
                    confidence: analysis.confidence,
                    extracted: analysis.extracted,
                    reasoning: analysis.reasoning,
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(session = %ctx.session_id, error = %err, "deep analyzer failed");
                self.degrade(last_good)
            }
            Err(_) => {
                tracing::warn!(
                    session = %ctx.session_id,
                    timeout_ms = self.deep_timeout.as_millis() as u64,
                    "deep analyzer timed out"
                );
                self.degrade(last_good)
            }
        }
    }

    /// Fall back to the last completed stage's verdict.
    fn degrade(&self, last_good: Option<ClassificationResult>) -> ClassificationResult {
        self.counters.degraded.fetch_add(1, Ordering::Relaxed);
        match last_good {
            Some(result) => result,
            None => ClassificationResult::episodic_fallback("all scoring stages unavailable"),
        }
    }

    /// Snapshot of funnel statistics.
    pub fn stats(&self) -> FunnelStats {
        FunnelStats {
            total: self.counters.total.load(Ordering::Relaxed),
            fast_rule: self.counters.fast_rule.load(Ordering::Relaxed),
            light_score: self.counters.light_score.load(Ordering::Relaxed),
            deep_analysis: self.counters.deep_analysis.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engram_models::ExtractedPayload;
    use engram_traits::{DeepAnalysis, LightScore, StoreError};

    struct FixedScorer {
        level: MemoryLevel,
        confidence: f32,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl LightScorer for FixedScorer {
        async fn score(&self, _input: &str, _user_id: &str) -> engram_traits::Result<LightScore> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(StoreError::Capability("scorer down".to_string()));
            }
            Ok(LightScore {
                level: self.level,
                confidence: self.confidence,
                reasoning: "fixed".to_string(),
            })
        }
    }

    struct FixedAnalyzer {
        level: MemoryLevel,
        extracted: Option<ExtractedPayload>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl DeepAnalyzer for FixedAnalyzer {
        async fn analyze(&self, _input: &str, _user_id: &str) -> engram_traits::Result<DeepAnalysis> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(StoreError::Capability("analyzer down".to_string()));
            }
            Ok(DeepAnalysis {
                level: self.level,
                confidence: 0.85,
                extracted: self.extracted.clone(),
                reasoning: "fixed".to_string(),
            })
        }
    }

    fn classifier(scorer: FixedScorer, analyzer: FixedAnalyzer) -> ValueClassifier {
        ValueClassifier::new(
            Arc::new(scorer),
            Arc::new(analyzer),
            Duration::from_millis(50),
            Duration::from_millis(50),
            0.6,
        )
    }

    fn ctx() -> SessionContext {
        SessionContext::for_session("session-1")
    }

    #[tokio::test]
    async fn test_fast_rule_short_circuits() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Episodic,
                confidence: 0.9,
                fail: false,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: None,
                fail: false,
                delay: None,
            },
        );

        let result = classifier.classify("哈哈哈", &ctx()).await;
        assert_eq!(result.level, MemoryLevel::Discard);
        assert_eq!(result.stage, FilterStage::FastRule);
        assert!(result.confidence >= 0.9);

        let stats = classifier.stats();
        assert_eq!(stats.fast_rule, 1);
        assert_eq!(stats.light_score, 0);
    }

    #[tokio::test]
    async fn test_confident_light_score_terminates() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Episodic,
                confidence: 0.8,
                fail: false,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: None,
                fail: true,
                delay: None,
            },
        );

        let result = classifier
            .classify("meeting with the client tomorrow", &ctx())
            .await;
        assert_eq!(result.level, MemoryLevel::Episodic);
        assert_eq!(result.stage, FilterStage::LightScore);
    }

    #[tokio::test]
    async fn test_low_confidence_escalates_to_deep() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Episodic,
                confidence: 0.3,
                fail: false,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Preference,
                extracted: Some(ExtractedPayload::Preference {
                    key: "management_style".to_string(),
                    value: "data-driven decisions".to_string(),
                }),
                fail: false,
                delay: None,
            },
        );

        let result = classifier
            .classify("my preferred style is data-driven decisions", &ctx())
            .await;
        assert_eq!(result.stage, FilterStage::DeepAnalysis);
        assert_eq!(result.level, MemoryLevel::Preference);
        assert!(matches!(
            result.extracted,
            Some(ExtractedPayload::Preference { .. })
        ));
    }

    #[tokio::test]
    async fn test_deep_failure_degrades_to_light_result() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Preference,
                confidence: 0.4,
                fail: false,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: None,
                fail: true,
                delay: None,
            },
        );

        let result = classifier.classify("I tend to like short reports", &ctx()).await;
        assert_eq!(result.stage, FilterStage::LightScore);
        assert_eq!(result.level, MemoryLevel::Preference);
        assert_eq!(classifier.stats().degraded, 1);
    }

    #[tokio::test]
    async fn test_total_failure_degrades_to_episodic_default() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Episodic,
                confidence: 0.9,
                fail: true,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: None,
                fail: true,
                delay: None,
            },
        );

        let result = classifier.classify("something substantive happened", &ctx()).await;
        assert_eq!(result.level, MemoryLevel::Episodic);
        assert!(result.confidence < 0.6);
    }

    #[tokio::test]
    async fn test_stage_timeouts_bound_latency() {
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Episodic,
                confidence: 0.9,
                fail: false,
                delay: Some(Duration::from_secs(5)),
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: None,
                fail: false,
                delay: Some(Duration::from_secs(5)),
            },
        );

        let start = std::time::Instant::now();
        let result = classifier.classify("slow capabilities everywhere", &ctx()).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        // Both stages timed out, so the episodic default applies
        assert_eq!(result.level, MemoryLevel::Episodic);
    }

    #[tokio::test]
    async fn test_deep_level_outside_light_band_escalates() {
        // A confident "semantic" guess from the light stage is out of its
        // band and must be confirmed by deep analysis.
        let classifier = classifier(
            FixedScorer {
                level: MemoryLevel::Semantic,
                confidence: 0.95,
                fail: false,
                delay: None,
            },
            FixedAnalyzer {
                level: MemoryLevel::Semantic,
                extracted: Some(ExtractedPayload::Fact {
                    text: "microservices decompose systems".to_string(),
                }),
                fail: false,
                delay: None,
            },
        );

        let result = classifier
            .classify("please explain microservice architecture", &ctx())
            .await;
        assert_eq!(result.stage, FilterStage::DeepAnalysis);
        assert_eq!(result.level, MemoryLevel::Semantic);
    }
}
