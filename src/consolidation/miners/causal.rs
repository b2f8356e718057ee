//! Causal miner: cause/effect phrasing inside a single entry.

use crate::consolidation::pattern::{MemoryPattern, PatternType};
use crate::memory::MemoryEntry;
use regex::Regex;
use std::sync::LazyLock;

/// Fixed confidence of every causal pattern.
const CAUSAL_CONFIDENCE: f32 = 0.8;

/// A causal-language template: which capture group holds the cause and which
/// holds the effect.
struct CausalTemplate {
    name: &'static str,
    pattern: Regex,
    cause: usize,
    effect: usize,
}

impl CausalTemplate {
    fn compile(name: &'static str, pattern: &str, cause: usize, effect: usize) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("causal template {name}: {e}")),
            cause,
            effect,
        }
    }
}

/// Ordered template catalogue. Content is lower-cased before matching and the
/// templates are compiled case-insensitive as well. Spans are greedy and may
/// contain any punctuation; "happened" after a `because of` effect is optional.
static CATALOGUE: LazyLock<Vec<CausalTemplate>> = LazyLock::new(|| {
    vec![
        CausalTemplate::compile(
            "because_of",
            r"(?i)because of (.+),\s*(.+?)(?:\s+happened)?[.!?]*$",
            1,
            2,
        ),
        CausalTemplate::compile("led_to", r"(?i)(.+) led to (.+)", 1, 2),
        CausalTemplate::compile("as_a_result_of", r"(?i)as a result of (.+),\s*(.+)", 1, 2),
        CausalTemplate::compile("caused", r"(?i)(.+) caused (.+)", 1, 2),
        CausalTemplate::compile("after_occurred", r"(?i)after (.+),\s*(.+) occurred", 1, 2),
        CausalTemplate::compile("when_i", r"(?i)when (.+),\s*i (.+)", 1, 2),
    ]
});

/// Trim whitespace and clause punctuation left at either end of a span.
fn clean_span(span: &str) -> &str {
    span.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
}

/// Emit one pattern per template match in every entry. No deduplication:
/// a single entry may produce several patterns.
pub fn mine(batch: &[MemoryEntry]) -> Vec<MemoryPattern> {
    let mut patterns = Vec::new();

    for entry in batch {
        let content = entry.content.to_lowercase();
        for template in CATALOGUE.iter() {
            for caps in template.pattern.captures_iter(&content) {
                let cause = caps.get(template.cause).map(|m| clean_span(m.as_str()));
                let effect = caps.get(template.effect).map(|m| clean_span(m.as_str()));
                let (Some(cause), Some(effect)) = (cause, effect) else {
                    continue;
                };
                if cause.is_empty() || effect.is_empty() {
                    continue;
                }

                tracing::trace!(template = template.name, id = %entry.id, "causal match");
                patterns.push(MemoryPattern::new(
                    PatternType::Causal,
                    format!("Causal relationship: {cause} → {effect}"),
                    CAUSAL_CONFIDENCE,
                    vec![entry.id.clone()],
                    format!("Understanding: {cause} typically results in {effect}"),
                    vec![cause.to_string(), effect.to_string()],
                ));
            }
        }
    }

    patterns
}
