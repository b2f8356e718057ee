//! REST memory API gateway

use super::{EpisodicSource, MemorySink};
use crate::config::GatewayConfig;
use crate::consolidation::ConsolidationResult;
use crate::error::{Error, Result};
use crate::memory::{Framework, MemoryEntry, MemoryType};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const EPISODIC_PATH: &str = "/api/v1/memory/episodic";
const SEMANTIC_STORE_PATH: &str = "/api/v1/memory/semantic/store";
const MEMORY_PATH: &str = "/api/v1/memory";
const CONSOLIDATION_RECORDS_PATH: &str = "/api/v1/memory/consolidation/records";

/// Gateway speaking the memory service's REST API.
pub struct HttpMemoryGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EpisodicResponse {
    #[serde(default)]
    memories: Vec<MemoryEntry>,
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    memory_id: String,
}

#[derive(Debug, Serialize)]
struct ImportancePatch {
    importance: f32,
    updated_at: DateTime<Utc>,
}

impl HttpMemoryGateway {
    /// Create a gateway for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a gateway from configuration. The per-call deadline is also set
    /// on the client so a stalled connection cannot outlive the engine's
    /// timeout.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.call_timeout())
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn episodic_query(
        framework: Framework,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("framework", framework.to_string()),
            ("memory_type", MemoryType::Episodic.as_str().to_string()),
            ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", limit.to_string()),
        ]
    }

    /// Decode an episodic listing, dropping entries of any other memory type.
    fn decode_episodic(body: &str) -> Result<Vec<MemoryEntry>> {
        let response: EpisodicResponse = serde_json::from_str(body)
            .map_err(|e| Error::Retrieval(format!("Malformed episodic response: {}", e)))?;
        Ok(response
            .memories
            .into_iter()
            .filter(|m| m.memory_type == MemoryType::Episodic)
            .collect())
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Store(format!("{} failed with {}: {}", context, status, body)))
    }
}

#[async_trait]
impl EpisodicSource for HttpMemoryGateway {
    async fn fetch(
        &self,
        framework: Framework,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let response = self
            .client
            .get(self.url(EPISODIC_PATH))
            .query(&Self::episodic_query(framework, since, limit))
            .send()
            .await
            .map_err(|e| Error::Retrieval(format!("Episodic request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Retrieval(format!("Failed to read episodic response: {}", e)))?;
        if !status.is_success() {
            return Err(Error::Retrieval(format!(
                "Episodic request failed with {}: {}",
                status, body
            )));
        }

        let mut memories = Self::decode_episodic(&body)?;
        memories.sort_by_key(|m| m.created_at);
        memories.truncate(limit);
        tracing::debug!(%framework, count = memories.len(), "Fetched episodic memories");
        Ok(memories)
    }
}

#[async_trait]
impl MemorySink for HttpMemoryGateway {
    async fn store_semantic(&self, entry: MemoryEntry) -> Result<String> {
        let response = self
            .client
            .post(self.url(SEMANTIC_STORE_PATH))
            .json(&entry)
            .send()
            .await?;
        let stored: StoreResponse = Self::check(response, "Semantic store").await?.json().await?;
        Ok(stored.memory_id)
    }

    async fn update_importance(&self, id: &str, importance: f32) -> Result<()> {
        let patch = ImportancePatch {
            importance,
            updated_at: Utc::now(),
        };
        let response = self
            .client
            .patch(self.url(&format!("{}/{}", MEMORY_PATH, id)))
            .json(&patch)
            .send()
            .await?;
        Self::check(response, "Importance update").await?;
        Ok(())
    }

    async fn record_consolidation(&self, result: &ConsolidationResult) -> Result<()> {
        let response = self
            .client
            .post(self.url(CONSOLIDATION_RECORDS_PATH))
            .json(result)
            .send()
            .await?;
        Self::check(response, "Consolidation record").await?;
        Ok(())
    }
}
