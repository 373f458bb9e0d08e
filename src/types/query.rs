//! Structured query and fact-verification types
//!
//! [`StructuredQuery`] is the sole query mechanism external translators
//! target: equality predicates on a type tag and property keys,
//! combined with logical AND. The engine does not parse any query
//! language itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which record kind a structured query matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTarget {
    Entities,
    Relationships,
}

/// An AND-combined set of equality predicates
///
/// Property values of the form `"$name"` are placeholders resolved from
/// the params map supplied alongside the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub target: QueryTarget,
    /// Entity or relationship type to match (case-insensitive)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    /// Property key -> expected value (compared against the stored
    /// value, ignoring per-value confidence)
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl StructuredQuery {
    /// Match all records of one kind
    pub fn all(target: QueryTarget) -> Self {
        Self {
            target,
            record_type: None,
            properties: BTreeMap::new(),
            limit: None,
        }
    }

    pub fn with_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Supporting evidence for a verified fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactEvidence {
    pub entity_id: String,
    pub entity_name: String,
    pub property: String,
    pub value: String,
}

/// Outcome of checking a statement against the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactVerification {
    pub verified: bool,
    /// Confidence of the supporting value, 0.0 when unverified
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<FactEvidence>,
}

impl FactVerification {
    /// An unverified verdict with no evidence
    pub fn unverified() -> Self {
        Self {
            verified: false,
            confidence: 0.0,
            evidence: None,
        }
    }
}
