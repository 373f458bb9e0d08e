//! Record union used by paths and query results

use serde::{Deserialize, Serialize};

use super::{Entity, Relationship};

/// Either an entity or a relationship record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum GraphRecord {
    Entity(Entity),
    Relationship(Relationship),
}

/// A path through the graph: an alternating sequence of entity and
/// relationship segments, starting and ending with an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPath {
    pub segments: Vec<GraphRecord>,
}

impl GraphPath {
    /// Number of edges along the path
    pub fn hops(&self) -> usize {
        self.segments.len() / 2
    }

    /// Entity ids along the path, in order
    pub fn entity_ids(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                GraphRecord::Entity(e) => Some(e.id.as_str()),
                GraphRecord::Relationship(_) => None,
            })
            .collect()
    }
}

/// Bounded neighborhood extracted around a center entity
///
/// `nodes` contains each reached entity exactly once (center first);
/// `edges` contains each relationship exactly once, in the order first
/// encountered. `truncated` is set when traversal was cancelled before
/// the requested depth was exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subgraph {
    pub center: String,
    pub nodes: Vec<Entity>,
    pub edges: Vec<Relationship>,
    #[serde(default)]
    pub truncated: bool,
}
