//! Relationship records for the knowledge graph

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

use super::property::{PropertyInput, PropertyValue};
use super::{default_confidence, default_source};

/// A typed edge connecting two entities
///
/// Directed from `source_id` to `target_id` unless `bidirectional` is
/// set, in which case traversal treats the edge as undirected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub relationship_type: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    pub confidence: f64,
    #[serde(default)]
    pub bidirectional: bool,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Whether this relationship has `entity_id` as either endpoint
    pub fn touches(&self, entity_id: &str) -> bool {
        self.source_id == entity_id || self.target_id == entity_id
    }

    /// The endpoint opposite to `entity_id`; for a self-loop this is
    /// the entity itself
    pub fn other_endpoint(&self, entity_id: &str) -> &str {
        if self.source_id == entity_id {
            &self.target_id
        } else {
            &self.source_id
        }
    }
}

/// Caller-supplied input for creating a relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDraft {
    pub relationship_type: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyInput>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default = "default_source")]
    pub source: String,
}

impl RelationshipDraft {
    /// Create a draft with defaults (confidence 1.0, directed, source
    /// "system")
    pub fn new(
        source_id: impl Into<String>,
        relationship_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            properties: BTreeMap::new(),
            confidence: default_confidence(),
            bidirectional: false,
            source: default_source(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyInput>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Direction filter for relationship lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = GraphError;

    fn from_str(s: &str) -> GraphResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "outgoing" => Ok(Direction::Outgoing),
            "incoming" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(GraphError::Validation(format!(
                "unknown direction '{other}', expected outgoing, incoming or both"
            ))),
        }
    }
}
