//! Engram Models - Shared data model for the tiered memory manager.
//!
//! This crate defines the serde types passed between the policy layer and the
//! persistence layer: memory items, conversation turns, round summaries,
//! classification results, and action signatures. It is intentionally free of
//! storage or runtime dependencies so every other crate can depend on it.

pub mod action;
pub mod classify;
pub mod item;
pub mod relation;
pub mod round;
pub mod skill;
pub mod turn;

mod time_utils;

pub use action::{ActionSignature, CachedAction};
pub use classify::{ClassificationResult, ExtractedPayload, FilterStage, MemoryLevel};
pub use item::{MemoryItem, MemoryKind, Provenance, VectorPartition, content_hash};
pub use relation::RelationTriple;
pub use round::RoundSummary;
pub use skill::SkillRecord;
pub use time_utils::now_ms;
pub use turn::{ToolInvocation, TurnRecord, TurnRole};
