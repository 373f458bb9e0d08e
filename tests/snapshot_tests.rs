//! Integration tests for snapshot load/save through the engine
//! lifecycle

use std::fs;

use tempfile::TempDir;

use factgraph::{
    EngineConfig, EngineState, EntityDraft, GraphError, KnowledgeEngine, RelationshipDraft,
};

fn snapshot_engine(dir: &TempDir) -> KnowledgeEngine {
    let config = EngineConfig::with_snapshot_path(dir.path().join("graph.jsonl"));
    KnowledgeEngine::with_config(config)
}

#[test]
fn test_shutdown_snapshot_survives_restart() {
    let dir = TempDir::new().unwrap();

    let engine = snapshot_engine(&dir);
    engine.initialize().unwrap();
    let ada = engine
        .add_entity(
            EntityDraft::new("person", "Ada Lovelace")
                .with_alias("Countess of Lovelace")
                .with_confidence(0.9),
        )
        .unwrap();
    let babbage = engine
        .add_entity(EntityDraft::new("person", "Charles Babbage"))
        .unwrap();
    let rel = engine
        .add_relationship(
            RelationshipDraft::new(&ada, "collaborated_with", &babbage).bidirectional(),
        )
        .unwrap();
    engine.shutdown().unwrap();

    // a fresh engine over the same path sees the same graph, ids intact
    let restarted = snapshot_engine(&dir);
    restarted.initialize().unwrap();

    let status = restarted.get_status();
    assert_eq!(status.entity_count, 2);
    assert_eq!(status.relationship_count, 1);

    let entity = restarted.get_entity(&ada).unwrap();
    assert_eq!(entity.name, "Ada Lovelace");
    assert_eq!(entity.confidence, 0.9);
    assert!(entity.aliases.contains(&"Countess of Lovelace".to_string()));

    let relationship = restarted.get_relationship(&rel).unwrap();
    assert!(relationship.bidirectional);

    // the adjacency index was rebuilt from the loaded relationships
    let paths = restarted.find_path(&babbage, &ada, Some(1)).unwrap();
    assert_eq!(paths.len(), 1);

    // merging still works against reloaded name index state
    let merged = restarted
        .add_entity(EntityDraft::new("person", "Ada Lovelace").with_confidence(0.5))
        .unwrap();
    assert_eq!(merged, ada);
}

#[test]
fn test_initialize_without_snapshot_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let engine = snapshot_engine(&dir);
    engine.initialize().unwrap();
    assert_eq!(engine.get_status().entity_count, 0);
}

#[test]
fn test_corrupted_snapshot_fails_initialize() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("graph.jsonl"), "garbage\n").unwrap();

    let engine = snapshot_engine(&dir);
    let err = engine.initialize().unwrap_err();
    assert!(matches!(err, GraphError::Snapshot(_)));
    assert_eq!(engine.get_status().state, EngineState::Uninitialized);
}

#[test]
fn test_export_snapshot_while_running() {
    let dir = TempDir::new().unwrap();
    let engine = snapshot_engine(&dir);
    engine.initialize().unwrap();
    engine
        .add_entity(EntityDraft::new("person", "Ada Lovelace"))
        .unwrap();

    let meta = engine.export_snapshot().unwrap();
    assert_eq!(meta.entity_count, 1);
    assert!(dir.path().join("graph.jsonl").exists());

    // the engine keeps serving after an export
    assert_eq!(engine.search_entities("ada", 10).unwrap().len(), 1);
}

#[test]
fn test_export_without_configured_path_rejected() {
    let engine = KnowledgeEngine::new();
    engine.initialize().unwrap();
    let err = engine.export_snapshot().unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
}

#[test]
fn test_shutdown_before_initialize_writes_no_snapshot() {
    let dir = TempDir::new().unwrap();
    let engine = snapshot_engine(&dir);
    engine.shutdown().unwrap();
    assert!(!dir.path().join("graph.jsonl").exists());
}
