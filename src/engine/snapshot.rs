//! JSONL snapshot save/load
//!
//! A snapshot is a metadata line followed by entity records and then
//! relationship records, one JSON object per line. Files are written
//! atomically: content goes to a temp file, is synced, and is renamed
//! over the final path, so a crash never leaves a partial snapshot
//! behind.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{GraphError, GraphResult};
use crate::types::{Entity, Relationship, SnapshotMeta, SNAPSHOT_VERSION};

/// Write a snapshot of the given records to `path`
pub(crate) fn save(
    entities: &[Entity],
    relationships: &[Relationship],
    path: &Path,
) -> GraphResult<SnapshotMeta> {
    let meta = SnapshotMeta::new(entities.len(), relationships.len());

    let mut content = String::new();
    content.push_str(&serde_json::to_string(&meta)?);
    content.push('\n');
    for entity in entities {
        content.push_str(&serde_json::to_string(entity)?);
        content.push('\n');
    }
    for relationship in relationships {
        content.push_str(&serde_json::to_string(relationship)?);
        content.push('\n');
    }

    atomic_write(path, &content)?;
    Ok(meta)
}

/// Load a snapshot from `path`, or `None` when the file does not exist
pub(crate) fn load(path: &Path) -> GraphResult<Option<(SnapshotMeta, Vec<Entity>, Vec<Relationship>)>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let meta_line = lines
        .next()
        .ok_or_else(|| GraphError::snapshot("empty snapshot file"))??;
    let meta: SnapshotMeta = serde_json::from_str(&meta_line)
        .map_err(|e| GraphError::Snapshot(format!("invalid metadata line: {e}")))?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(GraphError::Snapshot(format!(
            "unsupported snapshot version {}, expected {SNAPSHOT_VERSION}",
            meta.version
        )));
    }

    let mut entities = Vec::with_capacity(meta.entity_count);
    let mut relationships = Vec::with_capacity(meta.relationship_count);

    for (line_num, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| GraphError::Snapshot(format!("line {}: {e}", line_num + 2)))?;

        if value.get("entity_type").is_some() {
            let entity: Entity = serde_json::from_value(value)
                .map_err(|e| GraphError::Snapshot(format!("line {}: invalid entity: {e}", line_num + 2)))?;
            entities.push(entity);
        } else if value.get("relationship_type").is_some() {
            let relationship: Relationship = serde_json::from_value(value).map_err(|e| {
                GraphError::Snapshot(format!("line {}: invalid relationship: {e}", line_num + 2))
            })?;
            relationships.push(relationship);
        } else {
            return Err(GraphError::Snapshot(format!(
                "line {}: unrecognized record",
                line_num + 2
            )));
        }
    }

    if entities.len() != meta.entity_count || relationships.len() != meta.relationship_count {
        warn!(
            expected_entities = meta.entity_count,
            found_entities = entities.len(),
            expected_relationships = meta.relationship_count,
            found_relationships = relationships.len(),
            "snapshot record counts do not match metadata"
        );
    }

    Ok(Some((meta, entities, relationships)))
}

/// Write content to a temp file, sync it, and rename it over `path`
fn atomic_write(path: &Path, content: &str) -> GraphResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
