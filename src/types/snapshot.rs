//! Snapshot metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// First line of a JSONL snapshot file
///
/// The remaining lines are entity records followed by relationship
/// records in their serialized shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub created_at: DateTime<Utc>,
}

impl SnapshotMeta {
    /// Metadata for a snapshot taken now
    pub fn new(entity_count: usize, relationship_count: usize) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entity_count,
            relationship_count,
            created_at: Utc::now(),
        }
    }
}
