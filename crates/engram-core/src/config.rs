//! Memory manager configuration.

use std::time::Duration;

/// Default working buffer capacity, including the reserved system slot
pub const DEFAULT_WORKING_CAPACITY: usize = 20;

/// Default round summary lifetime
pub const DEFAULT_SUMMARY_TTL: Duration = Duration::from_secs(1800);

/// Default number of summaries assembled into context
pub const DEFAULT_SUMMARY_LAST_K: usize = 15;

/// Configuration for the memory policy layer.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Working buffer capacity `C` (default: 20, one slot reserved for the
    /// system instruction)
    pub working_capacity: usize,
    /// Round summary TTL in the short-term cache (default: 1800s)
    pub summary_ttl: Duration,
    /// How many summaries `build_context` pulls from the cache (default: 15)
    pub summary_last_k: usize,
    /// Light stage verdicts below this confidence escalate to deep analysis
    pub light_confidence_threshold: f32,
    /// Timeout for the light scoring capability
    pub light_timeout: Duration,
    /// Timeout for the deep analysis capability
    pub deep_timeout: Duration,
    /// Attempts for long-term store writes before dropping the item
    pub store_write_retries: u32,
    /// Base backoff between store write attempts (grows linearly)
    pub store_retry_backoff: Duration,
    /// Default result count for vector recall
    pub recall_top_k: usize,
    /// System instruction installed on buffer reset
    pub system_prompt: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            working_capacity: DEFAULT_WORKING_CAPACITY,
            summary_ttl: DEFAULT_SUMMARY_TTL,
            summary_last_k: DEFAULT_SUMMARY_LAST_K,
            light_confidence_threshold: 0.6,
            light_timeout: Duration::from_secs(5),
            deep_timeout: Duration::from_secs(30),
            store_write_retries: 3,
            store_retry_backoff: Duration::from_millis(100),
            recall_top_k: 5,
            system_prompt: "You are a helpful assistant.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.working_capacity, 20);
        assert_eq!(config.summary_ttl.as_secs(), 1800);
        assert_eq!(config.summary_last_k, 15);
    }
}
