//! Classification results produced by the value funnel.

use serde::{Deserialize, Serialize};

use crate::item::MemoryKind;

/// Memory value level assigned to an input.
///
/// Levels map to disposition: 1 discards, 2-5 route to a long-term store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLevel {
    /// Filler, acknowledgements, small talk
    Discard,
    /// Concrete events worth recalling
    Episodic,
    /// Personal habits and preferences
    Preference,
    /// Workflows and operational know-how
    Procedural,
    /// Knowledge and conceptual content
    Semantic,
}

impl MemoryLevel {
    /// Numeric level (1..=5) as used in logs and scoring capabilities.
    pub fn as_u8(&self) -> u8 {
        match self {
            MemoryLevel::Discard => 1,
            MemoryLevel::Episodic => 2,
            MemoryLevel::Preference => 3,
            MemoryLevel::Procedural => 4,
            MemoryLevel::Semantic => 5,
        }
    }

    /// Parse a numeric level; out-of-range values are clamped into 1..=5.
    pub fn from_u8(level: u8) -> Self {
        match level {
            0 | 1 => MemoryLevel::Discard,
            2 => MemoryLevel::Episodic,
            3 => MemoryLevel::Preference,
            4 => MemoryLevel::Procedural,
            _ => MemoryLevel::Semantic,
        }
    }

    /// The store kind this level routes to, if any.
    pub fn target_kind(&self) -> Option<MemoryKind> {
        match self {
            MemoryLevel::Discard => None,
            MemoryLevel::Episodic => Some(MemoryKind::Episodic),
            MemoryLevel::Preference => Some(MemoryKind::Preference),
            MemoryLevel::Procedural => Some(MemoryKind::Procedural),
            MemoryLevel::Semantic => Some(MemoryKind::Semantic),
        }
    }
}

/// Which funnel stage produced the final verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    FastRule,
    LightScore,
    DeepAnalysis,
}

/// Normalized payload extracted by deep analysis.
///
/// Persisted verbatim in place of the raw input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedPayload {
    /// A normalized preference key/value pair
    Preference { key: String, value: String },
    /// A named procedure description
    Procedure { name: String, description: String },
    /// A free-standing factual statement
    Fact { text: String },
    /// An entity relationship
    Relation {
        subject: String,
        relation: String,
        object: String,
    },
}

/// Outcome of running the 3-stage value funnel over one input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub level: MemoryLevel,
    pub stage: FilterStage,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Structured payload to persist instead of the raw input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedPayload>,
    /// Short human-readable verdict rationale
    #[serde(default)]
    pub reasoning: String,
}

impl ClassificationResult {
    /// The store kind this result routes to, if any.
    pub fn target_kind(&self) -> Option<MemoryKind> {
        self.level.target_kind()
    }

    /// Fast-rule discard verdict.
    pub fn discard(reasoning: impl Into<String>) -> Self {
        Self {
            level: MemoryLevel::Discard,
            stage: FilterStage::FastRule,
            confidence: 0.95,
            extracted: None,
            reasoning: reasoning.into(),
        }
    }

    /// The degraded default used when every escalation path failed:
    /// store as generic episodic rather than failing the turn.
    pub fn episodic_fallback(reasoning: impl Into<String>) -> Self {
        Self {
            level: MemoryLevel::Episodic,
            stage: FilterStage::LightScore,
            confidence: 0.4,
            extracted: None,
            reasoning: reasoning.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_numeric_mapping() {
        for n in 1..=5u8 {
            assert_eq!(MemoryLevel::from_u8(n).as_u8(), n);
        }
        // Out-of-range values clamp
        assert_eq!(MemoryLevel::from_u8(0), MemoryLevel::Discard);
        assert_eq!(MemoryLevel::from_u8(9), MemoryLevel::Semantic);
    }

    #[test]
    fn test_level_routing() {
        assert_eq!(MemoryLevel::Discard.target_kind(), None);
        assert_eq!(
            MemoryLevel::Preference.target_kind(),
            Some(MemoryKind::Preference)
        );
        assert_eq!(
            MemoryLevel::Semantic.target_kind(),
            Some(MemoryKind::Semantic)
        );
    }

    #[test]
    fn test_extracted_payload_serialization() {
        let payload = ExtractedPayload::Preference {
            key: "management_style".to_string(),
            value: "data-driven decisions".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"preference\""));
        assert!(json.contains("management_style"));

        let parsed: ExtractedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_discard_result() {
        let result = ClassificationResult::discard("matched laughter pattern");
        assert_eq!(result.level, MemoryLevel::Discard);
        assert_eq!(result.stage, FilterStage::FastRule);
        assert!(result.confidence >= 0.9);
        assert!(result.target_kind().is_none());
    }
}
