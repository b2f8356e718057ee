//! Patterns discovered in an episodic batch

use crate::memory::clamp_unit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of pattern, in miner declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Related entries following each other closely in time
    Temporal,
    /// Cause/effect language inside a single entry
    Causal,
    /// A concept shared by a cluster of entries
    Conceptual,
    /// Repeated decisions or actions around a concept
    Behavioral,
}

impl PatternType {
    /// All pattern types in declaration order
    pub const ALL: [PatternType; 4] = [
        PatternType::Temporal,
        PatternType::Causal,
        PatternType::Conceptual,
        PatternType::Behavioral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Temporal => "temporal",
            PatternType::Causal => "causal",
            PatternType::Conceptual => "conceptual",
            PatternType::Behavioral => "behavioral",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern identified in episodic memories. Lives only for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPattern {
    pub pattern_type: PatternType,
    /// Human-readable description
    pub description: String,
    /// Confidence (0.0–1.0)
    pub confidence: f32,
    /// IDs of the batch entries backing this pattern
    pub supporting_memories: Vec<String>,
    /// Generalized knowledge distilled from the pattern
    pub extracted_knowledge: String,
    pub concepts: Vec<String>,
}

impl MemoryPattern {
    /// Create a pattern; confidence is clamped to `[0, 1]`.
    pub fn new(
        pattern_type: PatternType,
        description: impl Into<String>,
        confidence: f32,
        supporting_memories: Vec<String>,
        extracted_knowledge: impl Into<String>,
        concepts: Vec<String>,
    ) -> Self {
        Self {
            pattern_type,
            description: description.into(),
            confidence: clamp_unit(confidence),
            supporting_memories,
            extracted_knowledge: extracted_knowledge.into(),
            concepts,
        }
    }
}
