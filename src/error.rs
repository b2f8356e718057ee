//! Consolidator error types

use thiserror::Error;

/// Consolidator error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Episodic retrieval failed (hard failure, aborts the run)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Memory store rejected a call
    #[error("Store error: {0}")]
    Store(String),

    /// A gateway call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A consolidation run for this framework is already in flight
    #[error("Consolidation already running for framework '{0}'")]
    AlreadyRunning(String),

    /// Orchestrator attempted an illegal state transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Memory model error
    #[error("Memory error: {0}")]
    Memory(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Consolidator operations
pub type Result<T> = std::result::Result<T, Error>;
