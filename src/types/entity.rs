//! Entity records for the knowledge graph

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::{PropertyInput, PropertyValue};
use super::{default_confidence, default_source, single_source};

/// A typed, named node in the knowledge graph
///
/// Entities are created only through the engine's add operation, which
/// mints the id and may merge the incoming record into an existing one
/// (see the merge rules in `engine::merge`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    pub confidence: f64,
    /// Most recent provenance tag
    pub source: String,
    /// Full provenance history, most recent last; always contains
    /// `source` as its final entry
    #[serde(default, skip_serializing_if = "single_source")]
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Whether `name` matches this entity's canonical name or any alias
    /// (case-insensitive)
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Whether the lowercased needle occurs in the name, an alias, or
    /// any string property value (case-insensitive substring match)
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        if self.name.to_lowercase().contains(needle_lower) {
            return true;
        }
        if self
            .aliases
            .iter()
            .any(|a| a.to_lowercase().contains(needle_lower))
        {
            return true;
        }
        self.properties.values().any(|p| {
            p.as_str()
                .is_some_and(|s| s.to_lowercase().contains(needle_lower))
        })
    }
}

/// Caller-supplied input for creating (or merging) an entity
///
/// The engine assigns the id and timestamps; drafts never carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDraft {
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyInput>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_source")]
    pub source: String,
}

impl EntityDraft {
    /// Create a draft with defaults (confidence 1.0, source "system")
    pub fn new(entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            name: name.into(),
            aliases: Vec::new(),
            properties: BTreeMap::new(),
            confidence: default_confidence(),
            source: default_source(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
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

/// Changes applied to an existing entity through the update operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityPatch {
    /// Replacement confidence for the entity itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub add_aliases: Vec<String>,
    #[serde(default)]
    pub remove_aliases: Vec<String>,
    /// Properties to set; plain values inherit the entity's confidence
    #[serde(default)]
    pub set_properties: BTreeMap<String, PropertyInput>,
    #[serde(default)]
    pub remove_properties: Vec<String>,
    /// Provenance tag for this update; appended to the history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
