//! In-memory memory store
//!
//! Implements both gateway traits over a `tokio::sync::RwLock`-guarded map, so a
//! consolidation run can execute fully in-process. Entries remember their
//! insertion sequence; retrieval orders by `created_at` and falls back to
//! insertion order for equal timestamps.

use super::entry::{clamp_unit, Framework, MemoryEntry, MemoryType};
use crate::consolidation::ConsolidationResult;
use crate::error::{Error, Result};
use crate::gateway::{EpisodicSource, MemorySink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Stored {
    seq: u64,
    entry: MemoryEntry,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    entries: HashMap<String, Stored>,
    consolidations: Vec<ConsolidationResult>,
}

/// In-memory store for memory entries and consolidation records
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`
    pub async fn with_entries(entries: impl IntoIterator<Item = MemoryEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.insert(entry).await;
        }
        store
    }

    /// Load a JSON array of entries from disk.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let entries: Vec<MemoryEntry> = serde_json::from_str(&raw)?;
        Ok(Self::with_entries(entries).await)
    }

    /// Insert an entry, assigning a fresh ID when it has none. Returns the ID.
    pub async fn insert(&self, mut entry: MemoryEntry) -> String {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        entry.importance = clamp_unit(entry.importance);
        let id = entry.id.clone();

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(id.clone(), Stored { seq, entry });
        id
    }

    /// Retrieve an entry by ID
    pub async fn get(&self, id: &str) -> Option<MemoryEntry> {
        self.inner.read().await.entries.get(id).map(|s| s.entry.clone())
    }

    /// All entries of a given type, in insertion order
    pub async fn find_by_type(&self, memory_type: MemoryType) -> Vec<MemoryEntry> {
        let inner = self.inner.read().await;
        let mut found: Vec<&Stored> = inner
            .entries
            .values()
            .filter(|s| s.entry.memory_type == memory_type)
            .collect();
        found.sort_by_key(|s| s.seq);
        found.into_iter().map(|s| s.entry.clone()).collect()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Consolidation records received so far, oldest first
    pub async fn consolidations(&self) -> Vec<ConsolidationResult> {
        self.inner.read().await.consolidations.clone()
    }
}

#[async_trait]
impl EpisodicSource for MemoryStore {
    async fn fetch(
        &self,
        framework: Framework,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let inner = self.inner.read().await;
        let mut batch: Vec<&Stored> = inner
            .entries
            .values()
            .filter(|s| {
                s.entry.memory_type == MemoryType::Episodic
                    && s.entry.framework == framework
                    && s.entry.created_at >= since
            })
            .collect();
        batch.sort_by(|a, b| {
            a.entry
                .created_at
                .cmp(&b.entry.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        Ok(batch
            .into_iter()
            .take(limit)
            .map(|s| s.entry.clone())
            .collect())
    }
}

#[async_trait]
impl MemorySink for MemoryStore {
    async fn store_semantic(&self, entry: MemoryEntry) -> Result<String> {
        if entry.memory_type != MemoryType::Semantic {
            return Err(Error::Store(format!(
                "expected a semantic entry, got {}",
                entry.memory_type.as_str()
            )));
        }
        Ok(self.insert(entry).await)
    }

    async fn update_importance(&self, id: &str, importance: f32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::Store(format!("memory {id} not found")))?;
        stored.entry.set_importance(importance);
        Ok(())
    }

    async fn record_consolidation(&self, result: &ConsolidationResult) -> Result<()> {
        self.inner.write().await.consolidations.push(result.clone());
        Ok(())
    }
}
