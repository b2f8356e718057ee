//! Pattern miners
//!
//! Four independent, deterministic miners over an immutable episodic batch:
//!
//! 1. **Temporal**: consecutive entries within a time gap sharing a concept.
//! 2. **Causal**: cause/effect phrasing matched by a fixed template catalogue.
//! 3. **Conceptual**: concepts shared by a sufficiently large group of entries.
//! 4. **Behavioral**: action-bearing entries repeatedly tied to one concept.
//!
//! Miners share no state, so they can run in any order or in parallel; the
//! caller concatenates their output in the declaration order above.

pub mod behavioral;
pub mod causal;
pub mod conceptual;
pub mod temporal;

use super::pattern::{MemoryPattern, PatternType};
use super::rules::MinerThresholds;
use crate::memory::MemoryEntry;
use std::collections::{HashMap, HashSet};

/// Run the miner for one pattern type.
pub fn run(
    pattern_type: PatternType,
    batch: &[MemoryEntry],
    thresholds: &MinerThresholds,
) -> Vec<MemoryPattern> {
    match pattern_type {
        PatternType::Temporal => temporal::mine(batch, thresholds.temporal_max_gap),
        PatternType::Causal => causal::mine(batch),
        PatternType::Conceptual => conceptual::mine(batch, thresholds.conceptual_min_group),
        PatternType::Behavioral => behavioral::mine(batch, thresholds.behavioral_min_group),
    }
}

/// Index entries by concept. Groups and their members keep first-seen order;
/// a concept repeated on one entry counts once.
pub(crate) fn group_by_concept<'a>(
    entries: impl Iterator<Item = &'a MemoryEntry>,
) -> Vec<(&'a str, Vec<&'a MemoryEntry>)> {
    let mut groups: Vec<(&'a str, Vec<&'a MemoryEntry>)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for entry in entries {
        let mut seen: HashSet<&str> = HashSet::new();
        for concept in &entry.concepts {
            if !seen.insert(concept.as_str()) {
                continue;
            }
            let slot = *index.entry(concept.as_str()).or_insert_with(|| {
                groups.push((concept.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(entry);
        }
    }

    groups
}

/// First `max_chars` characters of `content`.
pub(crate) fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
