//! Run-level consolidation score
//!
//! ```text
//! 0.5 · avg(confidence)
//!   + 0.3 · min(distinct_types / 4, 1)
//!   + 0.2 · min(persisted / surviving, 1)
//! ```
//!
//! Each term and the total are clamped to `[0, 1]`. No surviving patterns
//! means a score of zero.

use super::pattern::{MemoryPattern, PatternType};
use crate::memory::clamp_unit;
use std::collections::HashSet;

const CONFIDENCE_WEIGHT: f32 = 0.5;
const DIVERSITY_WEIGHT: f32 = 0.3;
const COMPLETENESS_WEIGHT: f32 = 0.2;

/// Score a run from its surviving patterns and the number of semantic entries
/// actually persisted.
pub fn consolidation_score(patterns: &[MemoryPattern], persisted: usize) -> f32 {
    if patterns.is_empty() {
        return 0.0;
    }
    let surviving = patterns.len() as f32;

    let avg_confidence =
        clamp_unit(patterns.iter().map(|p| clamp_unit(p.confidence)).sum::<f32>() / surviving);

    let distinct: HashSet<PatternType> = patterns.iter().map(|p| p.pattern_type).collect();
    let diversity = clamp_unit(distinct.len() as f32 / PatternType::ALL.len() as f32);

    let completeness = clamp_unit(persisted as f32 / surviving);

    clamp_unit(
        CONFIDENCE_WEIGHT * avg_confidence
            + DIVERSITY_WEIGHT * diversity
            + COMPLETENESS_WEIGHT * completeness,
    )
}
