//! Derived schema view over the live graph

use serde::{Deserialize, Serialize};

/// Distinct types and property keys present in the graph
///
/// Produced by scanning the current stores; never cached, so it always
/// reflects live state. Lists are sorted and deduplicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSchema {
    pub entity_types: Vec<String>,
    pub relationship_types: Vec<String>,
    pub property_keys: Vec<String>,
}
