//! Error taxonomy for the knowledge graph engine
//!
//! All store and query failures surface as typed [`GraphError`] values.
//! The engine never retries internally; callers decide what to do with a
//! failed operation. Internal consistency violations (index and store
//! disagreeing) are not represented here -- they are programming errors
//! and panic instead.

use thiserror::Error;

/// Result type used throughout the engine
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors surfaced by the knowledge graph engine
#[derive(Debug, Error)]
pub enum GraphError {
    /// No entity with the given id exists
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// No relationship with the given id exists
    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    /// Input violated a data-model invariant (confidence range,
    /// unknown endpoints, alias collisions, malformed query parameters)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation attempted outside the `initialized` lifecycle state
    #[error("engine not initialized (current state: {0})")]
    NotInitialized(String),

    /// Traversal bound exceeds the engine-enforced ceiling; rejected
    /// before any traversal work starts
    #[error("traversal depth {requested} exceeds the maximum of {maximum}")]
    DepthLimitExceeded { requested: usize, maximum: usize },

    /// Snapshot content could not be loaded or written
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Underlying I/O failure (snapshot file handling)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Shorthand for a [`GraphError::Validation`] with a formatted reason
    pub fn validation(reason: impl Into<String>) -> Self {
        GraphError::Validation(reason.into())
    }

    /// Shorthand for a [`GraphError::Snapshot`] with a formatted reason
    pub fn snapshot(reason: impl Into<String>) -> Self {
        GraphError::Snapshot(reason.into())
    }
}
