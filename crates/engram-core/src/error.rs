//! Error types for the memory policy layer.
//!
//! The propagation policy is deliberately asymmetric: classification and
//! archival failures degrade (the reasoning turn proceeds with reduced
//! context richness), while a failed round finalize is surfaced so the
//! caller can retry without losing the round.

use thiserror::Error;

use engram_models::FilterStage;
use engram_traits::StoreError;

/// Memory subsystem error types
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("classification stage {stage:?} timed out after {timeout_ms}ms")]
    ClassificationTimeout { stage: FilterStage, timeout_ms: u64 },

    #[error("classification capability error: {0}")]
    ClassificationCapability(String),

    #[error("store write failed after {attempts} attempts: {message}")]
    StoreWrite { attempts: u32, message: String },

    #[error("evicted turn could not be archived: {0}")]
    BufferOverflowLostWrite(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
