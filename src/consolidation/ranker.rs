//! Pattern aggregation and ranking

use super::pattern::MemoryPattern;
use std::cmp::Ordering;

/// Drop patterns below `min_confidence`, order the rest by confidence
/// (descending) and keep the first `max_patterns`.
///
/// The sort is stable, so equal confidences keep their input order. Callers
/// pass miner output concatenated in declaration order, which makes miner
/// order the tie-break. Confidences are never modified.
pub fn rank(
    candidates: Vec<MemoryPattern>,
    min_confidence: f32,
    max_patterns: usize,
) -> Vec<MemoryPattern> {
    let mut ranked: Vec<MemoryPattern> = candidates
        .into_iter()
        .filter(|p| p.confidence >= min_confidence)
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(max_patterns);
    ranked
}
