//! Data types for the knowledge graph engine
//!
//! This module contains all the core data structures used throughout
//! the crate: entity and relationship records, their caller-facing
//! drafts and patches, property values, paths and subgraphs, structured
//! queries, the derived schema view, and snapshot metadata.

mod entity;
mod property;
mod query;
mod record;
mod relationship;
mod schema;
mod snapshot;

pub use entity::{Entity, EntityDraft, EntityPatch};
pub use property::{resolve_properties, PropertyInput, PropertyValue};
pub use query::{FactEvidence, FactVerification, QueryTarget, StructuredQuery};
pub use record::{GraphPath, GraphRecord, Subgraph};
pub use relationship::{Direction, Relationship, RelationshipDraft};
pub use schema::GraphSchema;
pub use snapshot::{SnapshotMeta, SNAPSHOT_VERSION};

/// Default confidence for drafts that omit one
pub fn default_confidence() -> f64 {
    1.0
}

/// Default provenance tag for drafts that omit one
pub fn default_source() -> String {
    "system".to_string()
}

/// A provenance history of one entry carries no information beyond the
/// `source` field itself (for skip_serializing_if)
pub fn single_source(sources: &[String]) -> bool {
    sources.len() <= 1
}
