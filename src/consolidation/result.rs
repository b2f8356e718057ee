//! Consolidation run bookkeeping: lifecycle state, result record and history
//! metrics.

use crate::memory::Framework;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Orchestrator state machine.
///
/// ```text
/// Initiated → Retrieving → Mining → Aggregating → Extracting → Persisting → Feedback → Completed
///                 │  └──────────────── (batch < 2) ─────────────────────────────────────┘
///                 └→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initiated,
    Retrieving,
    Mining,
    Aggregating,
    Extracting,
    Persisting,
    Feedback,
    Completed,
    Failed,
}

impl RunState {
    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Initiated, Retrieving)
                | (Retrieving, Mining)
                | (Retrieving, Completed)
                | (Retrieving, Failed)
                | (Mining, Aggregating)
                | (Aggregating, Extracting)
                | (Extracting, Persisting)
                | (Persisting, Feedback)
                | (Feedback, Completed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Initiated => "initiated",
            RunState::Retrieving => "retrieving",
            RunState::Mining => "mining",
            RunState::Aggregating => "aggregating",
            RunState::Extracting => "extracting",
            RunState::Persisting => "persisting",
            RunState::Feedback => "feedback",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of one consolidation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationResult {
    pub consolidation_id: String,
    pub framework: Framework,
    pub status: RunStatus,
    /// Size of the retrieved episodic batch
    pub episodic_count: usize,
    /// Semantic entries successfully persisted
    pub semantic_count: usize,
    /// Run quality score (0.0–1.0)
    pub consolidation_score: f32,
    /// Descriptions of the surviving patterns, highest confidence first
    pub patterns_found: Vec<String>,
    /// IDs assigned to the persisted semantic entries
    pub new_memory_ids: Vec<String>,
    pub new_memories_created: usize,
    /// Episodic entries whose importance was raised
    pub importance_updates: usize,
    /// Persistence or feedback calls that failed or timed out
    pub skipped_items: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConsolidationResult {
    /// Open an empty result for a run that is starting now.
    pub fn open(consolidation_id: impl Into<String>, framework: Framework) -> Self {
        Self {
            consolidation_id: consolidation_id.into(),
            framework,
            status: RunStatus::Running,
            episodic_count: 0,
            semantic_count: 0,
            consolidation_score: 0.0,
            patterns_found: Vec::new(),
            new_memory_ids: Vec::new(),
            new_memories_created: 0,
            importance_updates: 0,
            skipped_items: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Number of surviving patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns_found.len()
    }

    /// Wall-clock duration, once completed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Aggregate view over a framework's run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationMetrics {
    pub total_consolidations: usize,
    pub avg_score: f32,
    /// Share of runs that completed (0.0–1.0)
    pub success_rate: f32,
    pub last_consolidation: Option<ConsolidationResult>,
}

impl ConsolidationMetrics {
    /// Summarize a history of runs.
    pub fn from_history(history: &[ConsolidationResult]) -> Self {
        if history.is_empty() {
            return Self {
                total_consolidations: 0,
                avg_score: 0.0,
                success_rate: 0.0,
                last_consolidation: None,
            };
        }

        let total = history.len() as f32;
        let completed = history
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .count();

        Self {
            total_consolidations: history.len(),
            avg_score: history.iter().map(|r| r.consolidation_score).sum::<f32>() / total,
            success_rate: completed as f32 / total,
            last_consolidation: history.iter().max_by_key(|r| r.started_at).cloned(),
        }
    }
}
