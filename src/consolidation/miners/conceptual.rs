//! Conceptual miner: concepts shared by a cluster of entries.

use super::group_by_concept;
use crate::consolidation::pattern::{MemoryPattern, PatternType};
use crate::memory::MemoryEntry;
use std::collections::HashMap;

/// Number of co-occurring concepts named in a pattern.
const TOP_RELATED: usize = 3;

/// Emit one pattern per concept group with at least `min_group` members.
pub fn mine(batch: &[MemoryEntry], min_group: usize) -> Vec<MemoryPattern> {
    group_by_concept(batch.iter())
        .into_iter()
        .filter(|(_, group)| group.len() >= min_group)
        .map(|(anchor, group)| {
            let related = related_concepts(anchor, &group);
            let ids: Vec<String> = group.iter().map(|e| e.id.clone()).collect();
            let confidence = (0.7 + 0.1 * (group.len() / 2) as f32).min(1.0);

            let (description, knowledge) = if related.is_empty() {
                (
                    format!("Conceptual cluster around '{anchor}' across {} memories", group.len()),
                    format!("Knowledge domain: {anchor} recurs across {} memories", group.len()),
                )
            } else {
                let listed = related.join(", ");
                (
                    format!("Conceptual cluster around '{anchor}' with related concepts: {listed}"),
                    format!("Knowledge domain: {anchor} is associated with {listed}"),
                )
            };

            let mut concepts = Vec::with_capacity(related.len() + 1);
            concepts.push(anchor.to_string());
            concepts.extend(related);

            MemoryPattern::new(
                PatternType::Conceptual,
                description,
                confidence,
                ids,
                knowledge,
                concepts,
            )
        })
        .collect()
}

/// Concepts other than `anchor` appearing on at least two group members,
/// most frequent first, ties by first appearance.
fn related_concepts(anchor: &str, group: &[&MemoryEntry]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for entry in group {
        for concept in &entry.concepts {
            if concept == anchor {
                continue;
            }
            let count = counts.entry(concept.as_str()).or_insert(0);
            if *count == 0 {
                order.push(concept.as_str());
            }
            *count += 1;
        }
    }

    // stable sort keeps first-appearance order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .filter(|c| counts[c] >= 2)
        .take(TOP_RELATED)
        .map(str::to_string)
        .collect()
}
