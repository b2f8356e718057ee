//! Consolidation orchestrator
//!
//! Drives one run through the [`RunState`] machine:
//! retrieve → mine → aggregate → extract → persist → feedback → complete.
//!
//! Only retrieval is a hard dependency. Every later gateway call is
//! best-effort: its outcome is recorded as a [`StepOutcome`] and folded into
//! the run counters, so callers always receive either a complete result or a
//! retrieval error.

use super::extractor::SemanticExtractor;
use super::miners;
use super::pattern::{MemoryPattern, PatternType};
use super::ranker;
use super::result::{ConsolidationMetrics, ConsolidationResult, RunState, RunStatus};
use super::rules::MinerThresholds;
use super::score::consolidation_score;
use crate::config::{ConsolidatorConfig, MiningConfig};
use crate::error::{Error, Result};
use crate::gateway::{with_timeout, EpisodicSource, MemorySink};
use crate::memory::{Framework, MemoryEntry};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Minimum batch size worth mining.
const MIN_BATCH: usize = 2;

/// Runs kept per framework; older results are dropped first.
const HISTORY_LIMIT: usize = 100;

/// Outcome of a single best-effort gateway call.
#[derive(Debug)]
pub enum StepOutcome<T> {
    Applied(T),
    Skipped(Error),
}

impl<T> From<Result<T>> for StepOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => StepOutcome::Applied(value),
            Err(e) => StepOutcome::Skipped(e),
        }
    }
}

/// Soft-failure bookkeeping for one run.
#[derive(Debug, Default)]
struct RunCounters {
    new_memory_ids: Vec<String>,
    importance_updates: usize,
    skipped: usize,
}

/// A planned importance change for one episodic entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceUpdate {
    pub memory_id: String,
    pub previous: f32,
    pub updated: f32,
}

/// Compute importance feedback for the batch entries referenced by `patterns`.
///
/// Each referencing pattern adds `confidence × boost_factor`; the result is
/// capped at 1.0. Updates follow batch order.
pub fn importance_feedback(
    batch: &[MemoryEntry],
    patterns: &[MemoryPattern],
    boost_factor: f32,
) -> Vec<ImportanceUpdate> {
    let mut boosts: HashMap<&str, f32> = HashMap::new();
    for pattern in patterns {
        for id in &pattern.supporting_memories {
            *boosts.entry(id.as_str()).or_insert(0.0) += pattern.confidence * boost_factor;
        }
    }

    let mut seen = HashSet::new();
    batch
        .iter()
        .filter(|e| seen.insert(e.id.as_str()))
        .filter_map(|entry| {
            let boost = *boosts.get(entry.id.as_str())?;
            Some(ImportanceUpdate {
                memory_id: entry.id.clone(),
                previous: entry.importance,
                updated: (entry.importance + boost).min(1.0),
            })
        })
        .collect()
}

/// Tracks the current state of one run and rejects illegal transitions.
struct RunTracker {
    consolidation_id: String,
    state: RunState,
}

impl RunTracker {
    fn new(consolidation_id: &str) -> Self {
        Self {
            consolidation_id: consolidation_id.to_string(),
            state: RunState::Initiated,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(
            consolidation_id = %self.consolidation_id,
            from = %self.state,
            to = %next,
            "Consolidation state change"
        );
        self.state = next;
        Ok(())
    }
}

/// Releases a framework's in-flight slot when dropped, including on
/// cancellation.
struct InFlightGuard {
    framework: Framework,
    in_flight: Arc<Mutex<HashSet<Framework>>>,
    held: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.held {
            self.in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.framework);
        }
    }
}

/// Orchestrates consolidation runs against a pair of gateways.
///
/// Cheap to share behind an `Arc`; runs for different frameworks proceed
/// concurrently, and at most one non-forced run per framework is in flight.
pub struct ConsolidationEngine {
    source: Arc<dyn EpisodicSource>,
    sink: Arc<dyn MemorySink>,
    mining: MiningConfig,
    thresholds: MinerThresholds,
    call_timeout: Duration,
    fetch_limit: usize,
    in_flight: Arc<Mutex<HashSet<Framework>>>,
    history: RwLock<HashMap<Framework, Vec<ConsolidationResult>>>,
}

impl ConsolidationEngine {
    /// Create an engine with default configuration.
    pub fn new(source: Arc<dyn EpisodicSource>, sink: Arc<dyn MemorySink>) -> Self {
        let defaults = ConsolidatorConfig::default();
        Self {
            source,
            sink,
            thresholds: defaults.mining.thresholds(),
            mining: defaults.mining,
            call_timeout: defaults.gateway.call_timeout(),
            fetch_limit: defaults.gateway.fetch_limit,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Apply gateway and mining settings from `config`.
    pub fn with_config(mut self, config: &ConsolidatorConfig) -> Self {
        self.thresholds = config.mining.thresholds();
        self.mining = config.mining.clone();
        self.call_timeout = config.gateway.call_timeout();
        self.fetch_limit = config.gateway.fetch_limit;
        self
    }

    /// Override the per-call gateway timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Whether a run for `framework` is currently in flight
    pub fn is_running(&self, framework: Framework) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&framework)
    }

    /// Consolidate the last `window` of episodic memories for `framework`.
    ///
    /// Fails only when retrieval fails or another run for the same framework
    /// is already in flight.
    pub async fn consolidate(
        &self,
        framework: Framework,
        window: Duration,
    ) -> Result<ConsolidationResult> {
        self.consolidate_with(framework, window, false).await
    }

    /// Like [`consolidate`](Self::consolidate); `force` bypasses the
    /// single-run-per-framework guard.
    pub async fn consolidate_with(
        &self,
        framework: Framework,
        window: Duration,
        force: bool,
    ) -> Result<ConsolidationResult> {
        let _guard = self.acquire(framework, force)?;

        let consolidation_id = format!(
            "consolidation_{}_{}_{}",
            framework,
            Utc::now().timestamp(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let mut run = RunTracker::new(&consolidation_id);
        let mut result = ConsolidationResult::open(&consolidation_id, framework);

        tracing::info!(
            %framework,
            consolidation_id = %consolidation_id,
            window_secs = window.as_secs(),
            "Starting memory consolidation"
        );

        // Retrieval: the only hard dependency
        run.advance(RunState::Retrieving)?;
        let batch = match self.retrieve(framework, window).await {
            Ok(batch) => batch,
            Err(e) => {
                run.advance(RunState::Failed)?;
                tracing::error!(
                    %framework,
                    consolidation_id = %consolidation_id,
                    error = %e,
                    "Consolidation failed during retrieval"
                );
                result.status = RunStatus::Failed;
                result.completed_at = Some(Utc::now());
                self.remember(result).await;
                return Err(match e {
                    Error::Retrieval(_) => e,
                    other => Error::Retrieval(other.to_string()),
                });
            }
        };
        result.episodic_count = batch.len();
        tracing::info!(
            consolidation_id = %consolidation_id,
            count = batch.len(),
            "Retrieved episodic memories"
        );

        if batch.len() < MIN_BATCH {
            run.advance(RunState::Completed)?;
            result.status = RunStatus::Completed;
            result.completed_at = Some(Utc::now());
            tracing::info!(
                consolidation_id = %consolidation_id,
                "Too few episodic memories to consolidate"
            );
            self.remember(result.clone()).await;
            return Ok(result);
        }
        let batch = Arc::new(batch);

        run.advance(RunState::Mining)?;
        let candidates = self.mine(batch.clone()).await;

        run.advance(RunState::Aggregating)?;
        let candidate_count = candidates.len();
        let patterns = ranker::rank(
            candidates,
            self.mining.min_confidence,
            self.mining.max_patterns,
        );
        tracing::info!(
            consolidation_id = %consolidation_id,
            candidates = candidate_count,
            surviving = patterns.len(),
            "Identified patterns"
        );

        run.advance(RunState::Extracting)?;
        let drafts = SemanticExtractor::extract(&patterns, framework, Utc::now());

        run.advance(RunState::Persisting)?;
        let mut counters = RunCounters::default();
        for draft in drafts {
            match self.persist(draft).await {
                StepOutcome::Applied(id) => {
                    tracing::debug!(
                        consolidation_id = %consolidation_id,
                        memory_id = %id,
                        "Stored semantic memory"
                    );
                    counters.new_memory_ids.push(id);
                }
                StepOutcome::Skipped(e) => {
                    tracing::warn!(
                        consolidation_id = %consolidation_id,
                        error = %e,
                        "Skipping semantic memory"
                    );
                    counters.skipped += 1;
                }
            }
        }

        run.advance(RunState::Feedback)?;
        for update in importance_feedback(&batch, &patterns, self.mining.importance_boost_factor) {
            match self.push_importance(&update).await {
                StepOutcome::Applied(()) => {
                    tracing::debug!(
                        memory_id = %update.memory_id,
                        previous = update.previous,
                        updated = update.updated,
                        "Updated memory importance"
                    );
                    counters.importance_updates += 1;
                }
                StepOutcome::Skipped(e) => {
                    tracing::warn!(
                        consolidation_id = %consolidation_id,
                        memory_id = %update.memory_id,
                        error = %e,
                        "Skipping importance update"
                    );
                    counters.skipped += 1;
                }
            }
        }

        run.advance(RunState::Completed)?;
        let persisted = counters.new_memory_ids.len();
        result.status = RunStatus::Completed;
        result.consolidation_score = consolidation_score(&patterns, persisted);
        result.patterns_found = patterns.iter().map(|p| p.description.clone()).collect();
        result.semantic_count = persisted;
        result.new_memories_created = persisted;
        result.new_memory_ids = counters.new_memory_ids;
        result.importance_updates = counters.importance_updates;
        result.skipped_items = counters.skipped;
        result.completed_at = Some(Utc::now());

        let recorded =
            with_timeout(self.call_timeout, self.sink.record_consolidation(&result)).await;
        if let Err(e) = recorded {
            tracing::warn!(
                consolidation_id = %consolidation_id,
                error = %e,
                "Failed to record consolidation"
            );
        }

        tracing::info!(
            %framework,
            consolidation_id = %consolidation_id,
            score = result.consolidation_score,
            patterns = result.pattern_count(),
            new_memories = result.new_memories_created,
            skipped = result.skipped_items,
            duration_ms = result.duration().map(|d| d.num_milliseconds()),
            "Consolidation completed"
        );
        self.remember(result.clone()).await;
        Ok(result)
    }

    /// Most recent runs recorded for `framework`, oldest first
    pub async fn history(&self, framework: Framework) -> Vec<ConsolidationResult> {
        self.history
            .read()
            .await
            .get(&framework)
            .cloned()
            .unwrap_or_default()
    }

    /// Summary metrics over the recorded runs for `framework`
    pub async fn metrics(&self, framework: Framework) -> ConsolidationMetrics {
        ConsolidationMetrics::from_history(&self.history(framework).await)
    }

    fn acquire(&self, framework: Framework, force: bool) -> Result<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let held = in_flight.insert(framework);
        if !held && !force {
            return Err(Error::AlreadyRunning(framework.to_string()));
        }
        Ok(InFlightGuard {
            framework,
            in_flight: self.in_flight.clone(),
            held,
        })
    }

    async fn retrieve(&self, framework: Framework, window: Duration) -> Result<Vec<MemoryEntry>> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| Error::Retrieval(format!("invalid time window: {e}")))?;
        let since = Utc::now()
            .checked_sub_signed(window)
            .ok_or_else(|| {
                Error::Retrieval("time window reaches before the earliest timestamp".to_string())
            })?;
        let mut batch = with_timeout(
            self.call_timeout,
            self.source.fetch(framework, since, self.fetch_limit),
        )
        .await?;
        batch.truncate(self.fetch_limit);
        Ok(batch)
    }

    /// Fan the batch out to the four miners and concatenate their output in
    /// declaration order.
    async fn mine(&self, batch: Arc<Vec<MemoryEntry>>) -> Vec<MemoryPattern> {
        let tasks = PatternType::ALL.map(|pattern_type| {
            let batch = batch.clone();
            let thresholds = self.thresholds;
            tokio::task::spawn_blocking(move || miners::run(pattern_type, &batch, &thresholds))
        });

        let mut candidates = Vec::new();
        for (pattern_type, joined) in PatternType::ALL
            .into_iter()
            .zip(futures::future::join_all(tasks).await)
        {
            match joined {
                Ok(patterns) => {
                    tracing::debug!(%pattern_type, count = patterns.len(), "Miner finished");
                    candidates.extend(patterns);
                }
                Err(e) => {
                    tracing::error!(%pattern_type, error = %e, "Miner task failed");
                }
            }
        }
        candidates
    }

    async fn persist(&self, draft: MemoryEntry) -> StepOutcome<String> {
        with_timeout(self.call_timeout, self.sink.store_semantic(draft))
            .await
            .into()
    }

    async fn push_importance(&self, update: &ImportanceUpdate) -> StepOutcome<()> {
        with_timeout(
            self.call_timeout,
            self.sink.update_importance(&update.memory_id, update.updated),
        )
        .await
        .into()
    }

    async fn remember(&self, result: ConsolidationResult) {
        let mut history = self.history.write().await;
        let runs = history.entry(result.framework).or_default();
        runs.push(result);
        if runs.len() > HISTORY_LIMIT {
            let excess = runs.len() - HISTORY_LIMIT;
            runs.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryEntryBuilder, MemoryStore, MemoryType};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const DAY: Duration = Duration::from_secs(86_400);

    fn episode(id: &str, content: &str, concepts: &[&str], at: DateTime<Utc>) -> MemoryEntry {
        MemoryEntryBuilder::episodic()
            .id(id)
            .content(content)
            .framework(Framework::Langchain)
            .concepts(concepts.iter().copied())
            .importance(0.5)
            .created_at(at)
            .build()
            .unwrap()
    }

    /// Five entries yielding exactly five causal patterns and nothing else.
    fn causal_batch() -> Vec<MemoryEntry> {
        let t0 = Utc::now() - chrono::Duration::hours(3);
        [
            "rain caused flooding",
            "heat caused fatigue",
            "noise caused stress",
            "traffic caused delays",
            "bugs caused outages",
        ]
        .iter()
        .enumerate()
        .map(|(i, content)| {
            episode(
                &format!("e{i}"),
                content,
                &[],
                t0 + chrono::Duration::minutes(i as i64 * 5),
            )
        })
        .collect()
    }

    fn rich_batch() -> Vec<MemoryEntry> {
        let t0 = Utc::now() - chrono::Duration::hours(2);
        vec![
            episode("a", "decided to set a monthly budget", &["budgeting", "savings"], t0),
            episode(
                "b",
                "chose a cheaper phone plan",
                &["budgeting", "savings"],
                t0 + chrono::Duration::minutes(20),
            ),
            episode(
                "c",
                "because of overspending, the budget was revised",
                &["budgeting"],
                t0 + chrono::Duration::minutes(40),
            ),
        ]
    }

    /// Gateway double with scripted failures.
    #[derive(Default)]
    struct ScriptedGateway {
        batch: Vec<MemoryEntry>,
        fail_fetch: bool,
        fetch_delay: Option<Duration>,
        fail_first_stores: usize,
        fail_updates: bool,
        fail_record: bool,
        block_fetch: Option<(Arc<Notify>, Arc<Notify>)>,
        store_calls: AtomicUsize,
        update_calls: AtomicUsize,
        record_calls: AtomicUsize,
        updates: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedGateway {
        fn with_batch(batch: Vec<MemoryEntry>) -> Self {
            Self {
                batch,
                ..Default::default()
            }
        }

        fn sink_calls(&self) -> usize {
            self.store_calls.load(Ordering::SeqCst)
                + self.update_calls.load(Ordering::SeqCst)
                + self.record_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EpisodicSource for ScriptedGateway {
        async fn fetch(
            &self,
            _framework: Framework,
            _since: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<MemoryEntry>> {
            if let Some((entered, release)) = &self.block_fetch {
                entered.notify_one();
                release.notified().await;
            }
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_fetch {
                return Err(Error::Retrieval("upstream unavailable".to_string()));
            }
            Ok(self.batch.iter().take(limit).cloned().collect())
        }
    }

    #[async_trait]
    impl MemorySink for ScriptedGateway {
        async fn store_semantic(&self, entry: MemoryEntry) -> Result<String> {
            let call = self.store_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_stores {
                return Err(Error::Store("write rejected".to_string()));
            }
            assert_eq!(entry.memory_type, MemoryType::Semantic);
            Ok(format!("sem-{call}"))
        }

        async fn update_importance(&self, id: &str, importance: f32) -> Result<()> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(Error::Store("update rejected".to_string()));
            }
            self.updates
                .lock()
                .unwrap()
                .push((id.to_string(), importance));
            Ok(())
        }

        async fn record_consolidation(&self, _result: &ConsolidationResult) -> Result<()> {
            self.record_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_record {
                return Err(Error::Store("record rejected".to_string()));
            }
            Ok(())
        }
    }

    fn engine_for(gateway: Arc<ScriptedGateway>) -> ConsolidationEngine {
        ConsolidationEngine::new(gateway.clone(), gateway)
    }

    #[tokio::test]
    async fn test_small_batch_short_circuits() {
        for batch in [Vec::new(), vec![episode("solo", "did a thing", &["x"], Utc::now())]] {
            let gateway = Arc::new(ScriptedGateway::with_batch(batch.clone()));
            let engine = engine_for(gateway.clone());

            let result = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
            assert_eq!(result.status, RunStatus::Completed);
            assert_eq!(result.episodic_count, batch.len());
            assert_eq!(result.pattern_count(), 0);
            assert_eq!(result.semantic_count, 0);
            assert_eq!(result.consolidation_score, 0.0);
            assert!(result.completed_at.is_some());
            assert_eq!(gateway.sink_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_hard() {
        let gateway = Arc::new(ScriptedGateway {
            fail_fetch: true,
            ..Default::default()
        });
        let engine = engine_for(gateway.clone());

        let err = engine
            .consolidate(Framework::Langchain, DAY)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert_eq!(gateway.sink_calls(), 0);

        let history = engine.history(Framework::Langchain).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RunStatus::Failed);
        assert!(!engine.is_running(Framework::Langchain));
    }

    #[tokio::test]
    async fn test_retrieval_timeout_is_hard() {
        let gateway = Arc::new(ScriptedGateway {
            batch: rich_batch(),
            fetch_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let engine = engine_for(gateway.clone()).with_call_timeout(Duration::from_millis(20));

        let err = engine
            .consolidate(Framework::Langchain, DAY)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert_eq!(gateway.sink_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_window_is_retrieval_error() {
        let gateway = Arc::new(ScriptedGateway::with_batch(rich_batch()));
        let engine = engine_for(gateway.clone());

        // passes the std -> chrono conversion but reaches before the earliest timestamp
        let window = Duration::from_secs(36_000_000_000_000);
        let err = engine
            .consolidate(Framework::Langchain, window)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert_eq!(gateway.sink_calls(), 0);

        let err = engine
            .consolidate(Framework::Langchain, Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert!(!engine.is_running(Framework::Langchain));
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let gateway = Arc::new(ScriptedGateway::default());
        let engine = engine_for(gateway);

        for _ in 0..HISTORY_LIMIT + 5 {
            engine.consolidate(Framework::Autogen, DAY).await.unwrap();
        }
        let history = engine.history(Framework::Autogen).await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(engine.metrics(Framework::Autogen).await.total_consolidations, HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn test_partial_store_failure() {
        let gateway = Arc::new(ScriptedGateway {
            batch: causal_batch(),
            fail_first_stores: 2,
            ..Default::default()
        });
        let engine = engine_for(gateway.clone());

        let result = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.pattern_count(), 5);
        assert_eq!(result.semantic_count, 3);
        assert_eq!(result.new_memories_created, 3);
        assert_eq!(result.new_memory_ids, vec!["sem-2", "sem-3", "sem-4"]);
        assert_eq!(result.skipped_items, 2);
        // 0.5*0.8 + 0.3*(1/4) + 0.2*(3/5)
        assert!(
            (result.consolidation_score - 0.595).abs() < 1e-6,
            "score {}",
            result.consolidation_score
        );
        assert_eq!(gateway.record_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_feedback_failures_are_soft() {
        let gateway = Arc::new(ScriptedGateway {
            batch: causal_batch(),
            fail_updates: true,
            fail_record: true,
            ..Default::default()
        });
        let engine = engine_for(gateway.clone());

        let result = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.semantic_count, 5);
        assert_eq!(result.importance_updates, 0);
        assert_eq!(result.skipped_items, 5);
        assert_eq!(gateway.update_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_feedback_pushes_boosted_importance() {
        let gateway = Arc::new(ScriptedGateway::with_batch(causal_batch()));
        let engine = engine_for(gateway.clone());

        let result = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        assert_eq!(result.importance_updates, 5);

        let updates = gateway.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 5);
        for (i, (id, value)) in updates.iter().enumerate() {
            assert_eq!(id, &format!("e{i}"));
            // 0.5 + 0.8 * 0.2
            assert!((value - 0.66).abs() < 1e-6, "{id}: {value}");
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_memory_store() {
        let store = Arc::new(MemoryStore::with_entries(rich_batch()).await);
        let engine = ConsolidationEngine::new(store.clone(), store.clone());

        let result = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        assert_eq!(result.episodic_count, 3);
        assert!(result.pattern_count() > 0);
        assert!(result.pattern_count() <= 10);
        assert_eq!(result.semantic_count, result.pattern_count());
        assert!((0.0..=1.0).contains(&result.consolidation_score));

        let semantic = store.find_by_type(MemoryType::Semantic).await;
        assert_eq!(semantic.len(), result.semantic_count);
        for entry in &semantic {
            let provenance = entry.provenance.as_ref().unwrap();
            assert!((0.0..=1.0).contains(&provenance.confidence));
            assert_eq!(entry.framework, Framework::Langchain);
            for id in &provenance.supporting_memories {
                assert!(["a", "b", "c"].contains(&id.as_str()));
            }
        }

        // every episode is referenced by the conceptual "budgeting" pattern
        for id in ["a", "b", "c"] {
            assert!(store.get(id).await.unwrap().importance > 0.5);
        }

        let recorded = store.consolidations().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0], result);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_deterministic() {
        let store = Arc::new(MemoryStore::with_entries(rich_batch()).await);
        let engine = ConsolidationEngine::new(store.clone(), store.clone());

        let first = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        let second = engine.consolidate(Framework::Langchain, DAY).await.unwrap();
        assert_eq!(first.pattern_count(), second.pattern_count());
        assert_eq!(first.patterns_found, second.patterns_found);
        assert!((first.consolidation_score - second.consolidation_score).abs() < f32::EPSILON);
        assert_ne!(first.consolidation_id, second.consolidation_id);

        let metrics = engine.metrics(Framework::Langchain).await;
        assert_eq!(metrics.total_consolidations, 2);
        assert!((metrics.success_rate - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_single_flight_per_framework() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gateway = Arc::new(ScriptedGateway {
            batch: rich_batch(),
            block_fetch: Some((entered.clone(), release.clone())),
            ..Default::default()
        });
        let engine =
            Arc::new(engine_for(gateway.clone()).with_call_timeout(Duration::from_secs(30)));

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.consolidate(Framework::Langchain, DAY).await })
        };
        entered.notified().await;
        assert!(engine.is_running(Framework::Langchain));

        let err = engine
            .consolidate(Framework::Langchain, DAY)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning(_)));

        release.notify_one();
        let result = running.await.unwrap().unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert!(!engine.is_running(Framework::Langchain));
    }

    #[tokio::test]
    async fn test_force_bypasses_guard() {
        let gateway = Arc::new(ScriptedGateway::with_batch(rich_batch()));
        let engine = engine_for(gateway);
        let _held = engine.acquire(Framework::Langchain, false).unwrap();

        assert!(matches!(
            engine.consolidate(Framework::Langchain, DAY).await,
            Err(Error::AlreadyRunning(_))
        ));
        let forced = engine
            .consolidate_with(Framework::Langchain, DAY, true)
            .await
            .unwrap();
        assert_eq!(forced.status, RunStatus::Completed);
        // the forced run must not release the slot it never held
        assert!(engine.is_running(Framework::Langchain));
    }

    #[test]
    fn test_importance_feedback_single_pattern() {
        let batch = vec![
            episode("a", "x", &[], Utc::now()),
            episode("b", "y", &[], Utc::now()),
        ];
        let pattern = MemoryPattern::new(
            PatternType::Conceptual,
            "d",
            0.6,
            vec!["a".to_string()],
            "k",
            vec![],
        );

        let updates = importance_feedback(&batch, &[pattern], 0.2);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].memory_id, "a");
        assert!((updates[0].previous - 0.5).abs() < f32::EPSILON);
        assert!((updates[0].updated - 0.62).abs() < 1e-6);
    }

    #[test]
    fn test_importance_feedback_accumulates_and_caps() {
        let mut high = episode("a", "x", &[], Utc::now());
        high.importance = 0.95;
        let batch = vec![high, episode("b", "y", &[], Utc::now())];
        let patterns = vec![
            MemoryPattern::new(
                PatternType::Temporal,
                "d",
                0.9,
                vec!["a".to_string(), "b".to_string()],
                "k",
                vec![],
            ),
            MemoryPattern::new(PatternType::Causal, "d", 0.8, vec!["b".to_string()], "k", vec![]),
        ];

        let updates = importance_feedback(&batch, &patterns, 0.2);
        assert_eq!(updates.len(), 2);
        assert!((updates[0].updated - 1.0).abs() < f32::EPSILON);
        // 0.5 + 0.9*0.2 + 0.8*0.2
        assert!((updates[1].updated - 0.84).abs() < 1e-6);
    }

    #[test]
    fn test_importance_feedback_ignores_unreferenced() {
        let batch = vec![episode("a", "x", &[], Utc::now())];
        assert!(importance_feedback(&batch, &[], 0.2).is_empty());
    }
}
