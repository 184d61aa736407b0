//! Engram Core - tiered memory manager for conversational agents.
//!
//! Decides what information from an interaction is worth retaining, where it
//! should live, for how long, and how it is reassembled into a bounded
//! context for the next decision cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MemoryService                          │
//! │                                                               │
//! │  input ──▶ WorkingBuffer ──overflow──▶ archival (episodic)    │
//! │    │            │                                             │
//! │    ▼            ▼ finalize                                    │
//! │  ValueClassifier ──▶ MemoryRouter ──▶ long-term stores        │
//! │  (3-stage funnel)     level 2..5      (kv / graph / vector /  │
//! │                                        skills)                │
//! │                                                               │
//! │  RoundCoordinator ──summary──▶ ShortTermCache (TTL)           │
//! │                                      │                        │
//! │  ContextAssembler ◀── snapshot ──────┘                        │
//! │    └──▶ bounded context (1 + 15 + C-1 records)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store backends and the scoring/embedding capabilities are injected via
//! the traits in `engram-traits`; `engram-storage` provides the embedded
//! reference adapters.

pub mod assembler;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod dedupe;
pub mod error;
pub mod router;
pub mod service;
pub mod stc;

pub use assembler::ContextAssembler;
pub use buffer::WorkingBuffer;
pub use classifier::{FunnelStats, SessionContext, ValueClassifier};
pub use config::MemoryConfig;
pub use coordinator::{RoundCoordinator, RoundPhase, TurnOutcome};
pub use dedupe::ActionDedupeCache;
pub use error::{MemoryError, Result};
pub use router::{MemoryRouter, StoreSet};
pub use service::MemoryService;
pub use stc::{ShortTermCache, SummaryStore};
