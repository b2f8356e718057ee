//! Semantic knowledge extraction
//!
//! Turns each surviving pattern into exactly one draft semantic entry. The draft
//! carries no ID; the store assigns one on persistence. Mapping is strictly 1:1,
//! patterns are never merged.

use super::pattern::MemoryPattern;
use crate::memory::{clamp_unit, Framework, MemoryEntry, MemoryType, Provenance};
use chrono::{DateTime, Utc};

/// Drafts semantic entries from ranked patterns.
pub struct SemanticExtractor;

impl SemanticExtractor {
    /// Draft one semantic entry per pattern, in pattern order.
    pub fn extract(
        patterns: &[MemoryPattern],
        framework: Framework,
        consolidated_at: DateTime<Utc>,
    ) -> Vec<MemoryEntry> {
        patterns
            .iter()
            .map(|p| Self::draft(p, framework, consolidated_at))
            .collect()
    }

    /// Draft a single semantic entry.
    ///
    /// Built directly rather than through `MemoryEntryBuilder` so that an empty
    /// knowledge string or concept list still yields a draft.
    pub fn draft(
        pattern: &MemoryPattern,
        framework: Framework,
        consolidated_at: DateTime<Utc>,
    ) -> MemoryEntry {
        let confidence = clamp_unit(pattern.confidence);
        MemoryEntry {
            id: String::new(),
            content: pattern.extracted_knowledge.clone(),
            memory_type: MemoryType::Semantic,
            framework,
            concepts: pattern.concepts.clone(),
            importance: confidence,
            created_at: consolidated_at,
            updated_at: consolidated_at,
            provenance: Some(Provenance {
                pattern_type: pattern.pattern_type,
                confidence,
                supporting_memories: pattern.supporting_memories.clone(),
                consolidated_at,
            }),
        }
    }
}
