//! Gateways to the external memory system
//!
//! The consolidation engine never talks to storage directly. It pulls episodic
//! batches through an [`EpisodicSource`] and pushes semantic entries, importance
//! updates and run summaries through a [`MemorySink`]. Two implementations ship
//! with the crate:
//!
//! - [`crate::memory::MemoryStore`]: in-process, used offline and in tests
//! - [`HttpMemoryGateway`]: the AgentOS REST memory API

pub mod http;

pub use http::HttpMemoryGateway;

use crate::consolidation::ConsolidationResult;
use crate::error::{Error, Result};
use crate::memory::{Framework, MemoryEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Source of episodic memory batches.
#[async_trait]
pub trait EpisodicSource: Send + Sync {
    /// Fetch episodic entries for `framework` created at or after `since`,
    /// ascending by `created_at`, at most `limit` items.
    async fn fetch(
        &self,
        framework: Framework,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>>;
}

/// Sink for everything a consolidation run produces.
///
/// Every call may fail independently; the engine treats failures as soft.
#[async_trait]
pub trait MemorySink: Send + Sync {
    /// Persist a drafted semantic entry, returning its assigned ID.
    async fn store_semantic(&self, entry: MemoryEntry) -> Result<String>;

    /// Overwrite the importance of an existing entry.
    async fn update_importance(&self, id: &str, importance: f32) -> Result<()>;

    /// Record the summary of a finished run.
    async fn record_consolidation(&self, result: &ConsolidationResult) -> Result<()>;
}

/// Await `fut` for at most `limit`, mapping an elapsed deadline to `Error::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(limit)),
    }
}
