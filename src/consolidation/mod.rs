//! Episodic → semantic consolidation
//!
//! Mines recurring patterns from a window of episodic memories, distills each
//! surviving pattern into a semantic entry, and feeds importance back to the
//! episodes that supported it.
//!
//! ## Components
//!
//! - [`miners`]: temporal, causal, conceptual and behavioral pattern miners
//! - [`ranker`]: confidence filtering and top-K selection
//! - [`SemanticExtractor`]: pattern → draft semantic entry
//! - [`consolidation_score`]: run quality score
//! - [`ConsolidationEngine`]: the orchestrator tying the stages together

pub mod engine;
pub mod extractor;
pub mod miners;
pub mod pattern;
pub mod ranker;
pub mod result;
pub mod rules;
pub mod score;

pub use engine::{importance_feedback, ConsolidationEngine, ImportanceUpdate, StepOutcome};
pub use extractor::SemanticExtractor;
pub use pattern::{MemoryPattern, PatternType};
pub use ranker::rank;
pub use result::{ConsolidationMetrics, ConsolidationResult, RunState, RunStatus};
pub use rules::{default_rules, ConsolidationRule, MinerThresholds, Strategy, TriggerType};
pub use score::consolidation_score;
