//! Behavioral miner: repeated decisions around the same concept.

use super::group_by_concept;
use crate::consolidation::pattern::{MemoryPattern, PatternType};
use crate::memory::MemoryEntry;

const BEHAVIORAL_CONFIDENCE: f32 = 0.7;

/// Substrings marking an entry as recording an action or decision.
const ACTION_VOCABULARY: [&str; 4] = ["decided", "chose", "selected", "did"];

fn records_action(entry: &MemoryEntry) -> bool {
    let content = entry.content.to_lowercase();
    ACTION_VOCABULARY.iter().any(|term| content.contains(term))
}

/// Group action-bearing entries by concept and emit one pattern per group of at
/// least `min_group` members.
pub fn mine(batch: &[MemoryEntry], min_group: usize) -> Vec<MemoryPattern> {
    group_by_concept(batch.iter().filter(|e| records_action(e)))
        .into_iter()
        .filter(|(_, group)| group.len() >= min_group)
        .map(|(concept, group)| {
            MemoryPattern::new(
                PatternType::Behavioral,
                format!("Behavioral pattern: repeated actions related to '{concept}'"),
                BEHAVIORAL_CONFIDENCE,
                group.iter().map(|e| e.id.clone()).collect(),
                format!(
                    "Behavioral insight: tendency to engage with {concept} in similar contexts"
                ),
                vec![concept.to_string()],
            )
        })
        .collect()
}
