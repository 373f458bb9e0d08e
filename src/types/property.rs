//! Property values with per-value confidence
//!
//! Entities and relationships carry open property bags. Every stored
//! value is tagged with its own confidence so that merges can keep the
//! better-supported fact; callers may supply plain JSON values, which
//! are wrapped at the owning record's confidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, GraphResult};
use crate::validation::validate_confidence;

/// A property value tagged with the confidence of the fact it records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub value: Value,
    pub confidence: f64,
}

impl PropertyValue {
    /// Create a tagged value
    pub fn new(value: Value, confidence: f64) -> Self {
        Self { value, confidence }
    }

    /// The value as a string slice, if it is a JSON string
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Caller-supplied property value: either already tagged with its own
/// confidence, or a plain JSON value inheriting the record's confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyInput {
    Tagged { value: Value, confidence: f64 },
    Plain(Value),
}

impl PropertyInput {
    /// Resolve to a stored [`PropertyValue`], filling in the default
    /// confidence for plain values
    pub fn into_value(self, default_confidence: f64) -> GraphResult<PropertyValue> {
        match self {
            PropertyInput::Tagged { value, confidence } => {
                validate_confidence(confidence)?;
                Ok(PropertyValue::new(value, confidence))
            }
            PropertyInput::Plain(value) => Ok(PropertyValue::new(value, default_confidence)),
        }
    }
}

impl From<Value> for PropertyInput {
    fn from(value: Value) -> Self {
        PropertyInput::Plain(value)
    }
}

impl From<&str> for PropertyInput {
    fn from(value: &str) -> Self {
        PropertyInput::Plain(Value::String(value.to_string()))
    }
}

/// Resolve a full map of caller-supplied properties
pub fn resolve_properties(
    raw: BTreeMap<String, PropertyInput>,
    default_confidence: f64,
) -> GraphResult<BTreeMap<String, PropertyValue>> {
    let mut resolved = BTreeMap::new();
    for (key, input) in raw {
        if key.is_empty() {
            return Err(GraphError::validation("property keys must not be empty"));
        }
        resolved.insert(key, input.into_value(default_confidence)?);
    }
    Ok(resolved)
}
