//! Consolidator - Episodic to Semantic Memory Consolidation
//!
//! Periodically distills an agent's recent episodic memories into durable
//! semantic knowledge, and raises the importance of the episodes that turned
//! out to matter.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                      ConsolidationEngine                            │
//! │                                                                     │
//! │  EpisodicSource ──► batch ──┬─► Temporal   ─┐                       │
//! │   (retrieval)               ├─► Causal     ─┤                       │
//! │                             ├─► Conceptual ─┼─► rank ─► extract     │
//! │                             └─► Behavioral ─┘              │        │
//! │                                                            ▼        │
//! │  MemorySink ◄── semantic entries, importance feedback, run record   │
//! └────────────────────────────────────────────────────────────────────┘
//!          ▲                                         ▲
//!          │ ConsolidationScheduler                  │ CLI
//! ```
//!
//! ## Modules
//!
//! - [`memory`]: memory entries and the in-process store
//! - [`consolidation`]: miners, ranking, extraction, scoring and the engine
//! - [`gateway`]: traits for the external memory system and the REST client
//! - [`scheduler`]: periodic consolidation rounds
//! - [`config`]: configuration management

pub mod config;
pub mod consolidation;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod scheduler;

pub use config::ConsolidatorConfig;
pub use consolidation::{ConsolidationEngine, ConsolidationMetrics, ConsolidationResult};
pub use error::{Error, Result};
pub use memory::{Framework, MemoryEntry, MemoryStore, MemoryType};
pub use scheduler::ConsolidationScheduler;
