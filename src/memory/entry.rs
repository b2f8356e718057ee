//! Memory entry data types
//!
//! A `MemoryEntry` is the unit exchanged with the memory store. Episodic entries
//! arrive from upstream interaction logging; semantic entries are drafted by the
//! consolidation pipeline and carry a `Provenance` record pointing back at the
//! episodic entries they were distilled from.

use crate::consolidation::PatternType;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clamp a score into `[0.0, 1.0]`. NaN collapses to `0.0`.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_unit<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    f32::deserialize(deserializer).map(clamp_unit)
}

fn deserialize_concepts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut concepts = Vec::with_capacity(raw.len());
    for concept in raw {
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }
    Ok(concepts)
}

fn default_importance() -> f32 {
    0.5
}

/// Kind of memory held by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Short-lived scratch memory for an active session
    Working,
    /// A raw, timestamped record of a single interaction
    #[default]
    Episodic,
    /// Generalized knowledge derived by consolidation
    Semantic,
    /// Learned procedures and skills
    Procedural,
}

impl MemoryType {
    /// Wire name of the memory type
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Working => "working",
            MemoryType::Episodic => "episodic",
            MemoryType::Semantic => "semantic",
            MemoryType::Procedural => "procedural",
        }
    }
}

/// Agent framework a memory entry or consolidation run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Langchain,
    Swarms,
    Crewai,
    Autogen,
    #[default]
    Universal,
}

/// Lookup table from wire name to framework tag.
const FRAMEWORK_TABLE: [(&str, Framework); 5] = [
    ("langchain", Framework::Langchain),
    ("swarms", Framework::Swarms),
    ("crewai", Framework::Crewai),
    ("autogen", Framework::Autogen),
    ("universal", Framework::Universal),
];

impl Framework {
    /// All supported frameworks, in table order
    pub fn all() -> impl Iterator<Item = Framework> {
        FRAMEWORK_TABLE.iter().map(|(_, f)| *f)
    }

    /// Wire name of the framework
    pub fn as_str(&self) -> &'static str {
        FRAMEWORK_TABLE
            .iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
            .unwrap_or("universal")
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        FRAMEWORK_TABLE
            .iter()
            .find(|(name, _)| *name == needle)
            .map(|(_, f)| *f)
            .ok_or_else(|| Error::Config(format!("unknown framework '{s}'")))
    }
}

/// Where a semantic entry came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Miner that discovered the originating pattern
    pub pattern_type: PatternType,
    /// Confidence of the originating pattern
    pub confidence: f32,
    /// Episodic entry IDs supporting the pattern
    pub supporting_memories: Vec<String>,
    /// When the consolidation produced this entry
    pub consolidated_at: DateTime<Utc>,
}

/// A single memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Opaque identifier assigned by the store
    #[serde(default)]
    pub id: String,
    /// Free-text content
    #[serde(default)]
    pub content: String,
    /// Kind of memory
    #[serde(default)]
    pub memory_type: MemoryType,
    /// Owning framework
    #[serde(default)]
    pub framework: Framework,
    /// Concept tags, de-duplicated, in insertion order
    #[serde(default, deserialize_with = "deserialize_concepts")]
    pub concepts: Vec<String>,
    /// Retention value (0.0–1.0)
    #[serde(default = "default_importance", deserialize_with = "deserialize_unit")]
    pub importance: f32,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Origin of a consolidated (semantic) entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl MemoryEntry {
    /// Whether this entry is tagged with `concept`
    pub fn has_concept(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }

    /// Replace the importance score, clamping it and bumping `updated_at`.
    pub fn set_importance(&mut self, value: f32) {
        self.importance = clamp_unit(value);
        self.updated_at = Utc::now();
    }
}

/// Builder for constructing `MemoryEntry` instances
pub struct MemoryEntryBuilder {
    id: Option<String>,
    content: Option<String>,
    memory_type: MemoryType,
    framework: Framework,
    concepts: Vec<String>,
    importance: f32,
    created_at: Option<DateTime<Utc>>,
    provenance: Option<Provenance>,
}

impl MemoryEntryBuilder {
    /// Create a new builder for the given memory type
    pub fn new(memory_type: MemoryType) -> Self {
        Self {
            id: None,
            content: None,
            memory_type,
            framework: Framework::Universal,
            concepts: Vec::new(),
            importance: default_importance(),
            created_at: None,
            provenance: None,
        }
    }

    /// Shorthand for an episodic entry builder
    pub fn episodic() -> Self {
        Self::new(MemoryType::Episodic)
    }

    /// Set an explicit ID (otherwise empty, assigned by the store)
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the framework
    pub fn framework(mut self, framework: Framework) -> Self {
        self.framework = framework;
        self
    }

    /// Add a concept tag (duplicates ignored)
    pub fn concept(mut self, concept: impl Into<String>) -> Self {
        let concept = concept.into();
        if !self.concepts.contains(&concept) {
            self.concepts.push(concept);
        }
        self
    }

    /// Add several concept tags
    pub fn concepts<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for concept in concepts {
            self = self.concept(concept);
        }
        self
    }

    /// Set the importance score (clamped to 0.0–1.0)
    pub fn importance(mut self, score: f32) -> Self {
        self.importance = clamp_unit(score);
        self
    }

    /// Set the creation timestamp (defaults to now)
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Attach provenance
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Build the entry, returning an error if content is missing
    pub fn build(self) -> Result<MemoryEntry> {
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Memory("memory content is required".to_string()))?;
        let created_at = self.created_at.unwrap_or_else(Utc::now);

        Ok(MemoryEntry {
            id: self.id.unwrap_or_default(),
            content,
            memory_type: self.memory_type,
            framework: self.framework,
            concepts: self.concepts,
            importance: self.importance,
            created_at,
            updated_at: created_at,
            provenance: self.provenance,
        })
    }
}
