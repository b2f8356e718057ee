//! Temporal miner: related entries that follow each other closely.

use super::preview;
use crate::consolidation::pattern::{MemoryPattern, PatternType};
use crate::memory::MemoryEntry;
use std::collections::HashSet;
use std::time::Duration;

/// Emit one "A precedes B" pattern per consecutive pair closer than `max_gap`
/// that shares at least one concept.
pub fn mine(batch: &[MemoryEntry], max_gap: Duration) -> Vec<MemoryPattern> {
    if batch.len() < 2 {
        return Vec::new();
    }

    // sort_by_key is stable: equal timestamps keep batch order
    let mut ordered: Vec<&MemoryEntry> = batch.iter().collect();
    ordered.sort_by_key(|e| e.created_at);

    ordered
        .windows(2)
        .filter_map(|pair| {
            let (current, next) = (pair[0], pair[1]);
            match (next.created_at - current.created_at).to_std() {
                Ok(gap) if gap < max_gap => {}
                _ => return None,
            }

            let mut seen = HashSet::new();
            let shared: Vec<String> = current
                .concepts
                .iter()
                .filter(|c| next.has_concept(c) && seen.insert(c.as_str()))
                .cloned()
                .collect();
            let first = shared.first()?.clone();

            Some(MemoryPattern::new(
                PatternType::Temporal,
                format!(
                    "Sequential pattern: {}... → {}...",
                    preview(&current.content, 50),
                    preview(&next.content, 50)
                ),
                (0.7 + 0.1 * shared.len() as f32).min(1.0),
                vec![current.id.clone(), next.id.clone()],
                format!("When {first} occurs, it often leads to related activities"),
                shared,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEntryBuilder;
    use chrono::{DateTime, Utc};

    const HOUR: Duration = Duration::from_secs(3600);

    fn entry(id: &str, at: DateTime<Utc>, concepts: &[&str]) -> MemoryEntry {
        MemoryEntryBuilder::episodic()
            .id(id)
            .content(format!("did something for {id}"))
            .concepts(concepts.iter().copied())
            .created_at(at)
            .build()
            .unwrap()
    }

    #[test]
    fn test_close_pair_sharing_two_concepts() {
        let t0 = Utc::now();
        let batch = vec![
            entry("a", t0, &["budget", "travel", "hotel"]),
            entry("b", t0 + chrono::Duration::minutes(30), &["travel", "budget"]),
        ];

        let patterns = mine(&batch, HOUR);
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.pattern_type, PatternType::Temporal);
        assert!((p.confidence - 0.9).abs() < 1e-6);
        assert_eq!(p.supporting_memories, vec!["a", "b"]);
        assert_eq!(p.concepts, vec!["budget", "travel"]);
        assert!(p.extracted_knowledge.starts_with("When budget occurs"));
    }

    #[test]
    fn test_gap_too_large() {
        let t0 = Utc::now();
        let batch = vec![
            entry("a", t0, &["budget", "travel"]),
            entry("b", t0 + chrono::Duration::hours(2), &["budget", "travel"]),
        ];
        assert!(mine(&batch, HOUR).is_empty());
    }

    #[test]
    fn test_gap_equal_to_ceiling_is_excluded() {
        let t0 = Utc::now();
        let batch = vec![
            entry("a", t0, &["x"]),
            entry("b", t0 + chrono::Duration::hours(1), &["x"]),
        ];
        assert!(mine(&batch, HOUR).is_empty());
    }

    #[test]
    fn test_no_shared_concepts() {
        let t0 = Utc::now();
        let batch = vec![
            entry("a", t0, &["x"]),
            entry("b", t0 + chrono::Duration::minutes(1), &["y"]),
        ];
        assert!(mine(&batch, HOUR).is_empty());
    }

    #[test]
    fn test_unsorted_input_and_confidence_cap() {
        let t0 = Utc::now();
        let concepts = ["a", "b", "c", "d", "e"];
        let batch = vec![
            entry("late", t0 + chrono::Duration::minutes(10), &concepts),
            entry("early", t0, &concepts),
        ];

        let patterns = mine(&batch, HOUR);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].supporting_memories, vec!["early", "late"]);
        assert!((patterns[0].confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_equal_timestamps_keep_order() {
        let t0 = Utc::now();
        let batch = vec![
            entry("first", t0, &["x"]),
            entry("second", t0, &["x"]),
            entry("third", t0, &["x"]),
        ];

        let patterns = mine(&batch, HOUR);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].supporting_memories, vec!["first", "second"]);
        assert_eq!(patterns[1].supporting_memories, vec!["second", "third"]);
    }

    #[test]
    fn test_repeated_concepts_count_once() {
        let t0 = Utc::now();
        let mut first = entry("a", t0, &["budget"]);
        first.concepts.push("budget".to_string());
        let decoded: MemoryEntry = serde_json::from_value(serde_json::json!({
            "id": "b",
            "content": "did the budget",
            "concepts": ["budget", "budget"],
            "created_at": (t0 + chrono::Duration::minutes(5)).to_rfc3339(),
        }))
        .unwrap();

        let patterns = mine(&[first, decoded], HOUR);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].concepts, vec!["budget"]);
        assert!((patterns[0].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_small_batches() {
        assert!(mine(&[], HOUR).is_empty());
        assert!(mine(&[entry("a", Utc::now(), &["x"])], HOUR).is_empty());
    }
}
