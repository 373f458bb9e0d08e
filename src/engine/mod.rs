//! Knowledge graph engine
//!
//! This module contains the engine facade and the store triple it
//! guards. The entity store, relationship store and adjacency index
//! form one logical unit behind a single readers-writer lock: mutations
//! take the write lock for a whole logical operation (including
//! cascades and index maintenance), while reads and traversals share
//! the read lock for the duration of a single call and therefore see a
//! consistent point-in-time view. Traversals never block each other.

mod entities;
mod index;
mod merge;
mod query;
mod relationships;
mod snapshot;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{GraphError, GraphResult};
use crate::types::{
    Direction, Entity, EntityDraft, EntityPatch, FactVerification, GraphPath, GraphRecord,
    GraphSchema, Relationship, RelationshipDraft, SnapshotMeta, StructuredQuery, Subgraph,
};

pub use entities::EntityStore;
pub use index::{AdjacencyEntry, GraphIndex};
pub use relationships::RelationshipStore;

/// Engine-enforced ceiling on traversal bounds
pub const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Bound applied when a caller omits one
pub const DEFAULT_TRAVERSAL_DEPTH: usize = 3;

/// Combined mutable graph state; always read and mutated as a unit
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    pub(crate) entities: EntityStore,
    pub(crate) relationships: RelationshipStore,
    pub(crate) index: GraphIndex,
}

impl GraphStore {
    /// Fetch an entity the adjacency index claims exists; disagreement
    /// is a broken invariant
    pub(crate) fn expect_entity(&self, id: &str) -> &Entity {
        self.entities
            .get(id)
            .unwrap_or_else(|| panic!("adjacency references missing entity {id}"))
    }

    fn clear(&mut self) {
        *self = GraphStore::default();
    }

    /// Rebuild the store triple from snapshot records, re-validating
    /// every invariant; the current state is replaced only on success
    fn restore(&mut self, entities: Vec<Entity>, relationships: Vec<Relationship>) -> GraphResult<()> {
        let mut fresh = GraphStore::default();
        for entity in entities {
            fresh
                .entities
                .insert_loaded(entity)
                .map_err(|e| GraphError::Snapshot(e.to_string()))?;
        }
        for relationship in relationships {
            fresh
                .relationships
                .insert_loaded(relationship, &fresh.entities, &mut fresh.index)
                .map_err(|e| GraphError::Snapshot(e.to_string()))?;
        }
        *self = fresh;
        Ok(())
    }
}

/// Lifecycle states of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Initialized,
    ShuttingDown,
    Shutdown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Initialized => "initialized",
            EngineState::ShuttingDown => "shutting_down",
            EngineState::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Current state plus store counts, reportable in every state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub entity_count: usize,
    pub relationship_count: usize,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Snapshot file loaded on initialize and written on shutdown;
    /// `None` disables snapshots
    pub snapshot_path: Option<PathBuf>,
    /// Ceiling on caller-supplied traversal bounds
    pub max_traversal_depth: usize,
    /// Bound used when a caller omits one
    pub default_traversal_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            max_traversal_depth: MAX_TRAVERSAL_DEPTH,
            default_traversal_depth: DEFAULT_TRAVERSAL_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Default configuration with snapshotting into `path`
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Cooperative cancellation flag for long-running traversals
///
/// Checked between BFS levels; a cancelled traversal returns the work
/// done so far, flagged as truncated, instead of hanging.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The knowledge graph engine facade
///
/// One instance is constructed at process start and shared (by
/// reference or `Arc`) with every consumer; lifecycle transitions are
/// explicit method calls. All operations other than [`get_status`],
/// [`initialize`], [`shutdown`] and [`cleanup`] require the
/// `initialized` state.
///
/// [`get_status`]: KnowledgeEngine::get_status
/// [`initialize`]: KnowledgeEngine::initialize
/// [`shutdown`]: KnowledgeEngine::shutdown
/// [`cleanup`]: KnowledgeEngine::cleanup
pub struct KnowledgeEngine {
    config: EngineConfig,
    // lock order: state before store
    state: RwLock<EngineState>,
    store: RwLock<GraphStore>,
}

impl KnowledgeEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: RwLock::new(EngineState::Uninitialized),
            store: RwLock::new(GraphStore::default()),
        }
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- lifecycle ----------------------------------------------------

    /// Construct empty stores, or load the configured snapshot, and
    /// transition to `initialized`
    ///
    /// Initializing an already initialized engine is a no-op.
    pub fn initialize(&self) -> GraphResult<()> {
        {
            let mut state = self.state.write();
            match *state {
                EngineState::Initialized => {
                    warn!("initialize called on an already initialized engine");
                    return Ok(());
                }
                EngineState::Uninitialized | EngineState::Shutdown => {
                    *state = EngineState::Initializing;
                }
                other => return Err(GraphError::NotInitialized(other.to_string())),
            }
        }

        if let Some(path) = &self.config.snapshot_path {
            match snapshot::load(path) {
                Ok(Some((meta, entities, relationships))) => {
                    let restored = self.store.write().restore(entities, relationships);
                    if let Err(e) = restored {
                        *self.state.write() = EngineState::Uninitialized;
                        return Err(e);
                    }
                    info!(
                        entities = meta.entity_count,
                        relationships = meta.relationship_count,
                        "loaded snapshot"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    *self.state.write() = EngineState::Uninitialized;
                    return Err(e);
                }
            }
        }

        *self.state.write() = EngineState::Initialized;
        info!("knowledge engine initialized");
        Ok(())
    }

    /// Write the configured snapshot (when initialized) and transition
    /// to `shutdown`; idempotent
    pub fn shutdown(&self) -> GraphResult<()> {
        let prior = {
            let mut state = self.state.write();
            let prior = *state;
            if prior == EngineState::Shutdown {
                return Ok(());
            }
            *state = EngineState::ShuttingDown;
            prior
        };

        // never overwrite a snapshot with the empty store of an engine
        // that was shut down before it initialized
        if prior == EngineState::Initialized {
            if let Some(path) = &self.config.snapshot_path {
                let (entities, relationships) = self.copy_records();
                if let Err(e) = snapshot::save(&entities, &relationships, path) {
                    warn!(error = %e, "failed to write shutdown snapshot");
                }
            }
        }

        *self.state.write() = EngineState::Shutdown;
        info!("knowledge engine shut down");
        Ok(())
    }

    /// Shut down and clear the stores; idempotent
    pub fn cleanup(&self) -> GraphResult<()> {
        self.shutdown()?;
        self.store.write().clear();
        Ok(())
    }

    /// Current lifecycle state and store counts; available in every
    /// state
    pub fn get_status(&self) -> EngineStatus {
        let state = *self.state.read();
        let store = self.store.read();
        EngineStatus {
            state,
            entity_count: store.entities.len(),
            relationship_count: store.relationships.len(),
        }
    }

    /// Write a snapshot of the current graph to the configured path
    ///
    /// The store lock is held only while copying a consistent view;
    /// the file is written after the lock is released.
    pub fn export_snapshot(&self) -> GraphResult<SnapshotMeta> {
        self.ensure_initialized()?;
        let path = self
            .config
            .snapshot_path
            .clone()
            .ok_or_else(|| GraphError::validation("no snapshot path configured"))?;
        let (entities, relationships) = self.copy_records();
        let meta = snapshot::save(&entities, &relationships, &path)?;
        info!(
            entities = meta.entity_count,
            relationships = meta.relationship_count,
            path = %path.display(),
            "exported snapshot"
        );
        Ok(meta)
    }

    // -- entity operations --------------------------------------------

    /// Add an entity, merging on name/alias collision; returns the id
    /// of the stored entity
    pub fn add_entity(&self, draft: EntityDraft) -> GraphResult<String> {
        self.ensure_initialized()?;
        let mut store = self.store.write();
        let id = store.entities.add(draft)?;
        debug!(entity_id = %id, "entity stored");
        Ok(id)
    }

    /// Fetch an entity by id
    pub fn get_entity(&self, id: &str) -> GraphResult<Entity> {
        self.ensure_initialized()?;
        self.store
            .read()
            .entities
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::EntityNotFound(id.to_string()))
    }

    /// Search entities by case-insensitive substring over names,
    /// aliases and string property values
    pub fn search_entities(&self, query: &str, limit: usize) -> GraphResult<Vec<Entity>> {
        self.ensure_initialized()?;
        Ok(self.store.read().entities.search(query, limit))
    }

    /// Apply a patch to an entity
    pub fn update_entity(&self, id: &str, patch: EntityPatch) -> GraphResult<Entity> {
        self.ensure_initialized()?;
        let mut store = self.store.write();
        let updated = store.entities.update(id, patch)?;
        debug!(entity_id = %id, "entity updated");
        Ok(updated)
    }

    /// Delete an entity and every relationship referencing it
    ///
    /// Returns `false` when no such entity exists.
    pub fn delete_entity(&self, id: &str) -> GraphResult<bool> {
        self.ensure_initialized()?;
        let mut store = self.store.write();
        let store = &mut *store;
        if !store.entities.contains(id) {
            return Ok(false);
        }
        let removed = store.relationships.remove_touching(id, &mut store.index);
        store.entities.remove(id);
        debug!(entity_id = %id, cascaded = removed.len(), "entity deleted");
        Ok(true)
    }

    // -- relationship operations --------------------------------------

    /// Add a relationship between two existing entities; returns the id
    /// of the stored relationship
    pub fn add_relationship(&self, draft: RelationshipDraft) -> GraphResult<String> {
        self.ensure_initialized()?;
        let mut store = self.store.write();
        let store = &mut *store;
        let id = store
            .relationships
            .add(draft, &store.entities, &mut store.index)?;
        debug!(relationship_id = %id, "relationship stored");
        Ok(id)
    }

    /// Fetch a relationship by id
    pub fn get_relationship(&self, id: &str) -> GraphResult<Relationship> {
        self.ensure_initialized()?;
        self.store
            .read()
            .relationships
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::RelationshipNotFound(id.to_string()))
    }

    /// Relationships touching an entity, each paired with the connected
    /// entity
    pub fn get_entity_relationships(
        &self,
        id: &str,
        direction: Direction,
    ) -> GraphResult<Vec<(Relationship, Entity)>> {
        self.ensure_initialized()?;
        let store = self.store.read();
        if !store.entities.contains(id) {
            return Err(GraphError::EntityNotFound(id.to_string()));
        }
        Ok(store
            .relationships
            .relationships_for(id, direction, &store.index)
            .into_iter()
            .map(|(relationship, connected_id)| {
                let connected = store.expect_entity(&connected_id).clone();
                (relationship, connected)
            })
            .collect())
    }

    /// Delete a relationship
    ///
    /// Returns `false` when no such relationship exists.
    pub fn delete_relationship(&self, id: &str) -> GraphResult<bool> {
        self.ensure_initialized()?;
        let mut store = self.store.write();
        let store = &mut *store;
        let removed = store.relationships.remove(id, &mut store.index).is_some();
        if removed {
            debug!(relationship_id = %id, "relationship deleted");
        }
        Ok(removed)
    }

    // -- queries ------------------------------------------------------

    /// All shortest paths between two entities within `max_depth` hops
    /// (engine default when omitted)
    pub fn find_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: Option<usize>,
    ) -> GraphResult<Vec<GraphPath>> {
        self.ensure_initialized()?;
        let depth = self.resolve_depth(max_depth)?;
        query::find_path(&self.store.read(), source_id, target_id, depth)
    }

    /// Bounded subgraph around a center entity (engine default depth
    /// when omitted)
    pub fn get_entity_graph(&self, center_id: &str, depth: Option<usize>) -> GraphResult<Subgraph> {
        self.ensure_initialized()?;
        let depth = self.resolve_depth(depth)?;
        query::entity_subgraph(&self.store.read(), center_id, depth, None)
    }

    /// Like [`get_entity_graph`](KnowledgeEngine::get_entity_graph),
    /// interruptible between traversal levels
    pub fn get_entity_graph_with_cancel(
        &self,
        center_id: &str,
        depth: Option<usize>,
        cancel: &CancelToken,
    ) -> GraphResult<Subgraph> {
        self.ensure_initialized()?;
        let depth = self.resolve_depth(depth)?;
        query::entity_subgraph(&self.store.read(), center_id, depth, Some(cancel))
    }

    /// Evaluate a structured filter; the sole query mechanism external
    /// translators target
    pub fn execute_query(
        &self,
        query: &StructuredQuery,
        params: &HashMap<String, Value>,
    ) -> GraphResult<Vec<GraphRecord>> {
        self.ensure_initialized()?;
        query::execute_query(&self.store.read(), query, params)
    }

    /// Distinct types and property keys currently in the graph
    pub fn get_schema(&self) -> GraphResult<GraphSchema> {
        self.ensure_initialized()?;
        Ok(query::schema(&self.store.read()))
    }

    /// Check a statement against stored property values
    pub fn verify_fact(&self, statement: &str, threshold: f64) -> GraphResult<FactVerification> {
        self.ensure_initialized()?;
        query::verify_fact(&self.store.read(), statement, threshold)
    }

    /// Find paths between entities resolved by name search
    pub fn find_connections(
        &self,
        name_a: &str,
        name_b: &str,
        max_depth: Option<usize>,
    ) -> GraphResult<Vec<GraphPath>> {
        self.ensure_initialized()?;
        let depth = self.resolve_depth(max_depth)?;
        query::find_connections(&self.store.read(), name_a, name_b, depth)
    }

    // -- internals ----------------------------------------------------

    fn ensure_initialized(&self) -> GraphResult<()> {
        let state = *self.state.read();
        if state == EngineState::Initialized {
            Ok(())
        } else {
            Err(GraphError::NotInitialized(state.to_string()))
        }
    }

    fn resolve_depth(&self, requested: Option<usize>) -> GraphResult<usize> {
        match requested {
            None => Ok(self.config.default_traversal_depth),
            Some(depth) if depth > self.config.max_traversal_depth => {
                Err(GraphError::DepthLimitExceeded {
                    requested: depth,
                    maximum: self.config.max_traversal_depth,
                })
            }
            Some(depth) => Ok(depth),
        }
    }

    /// Copy the records out under the read lock, in a stable order
    fn copy_records(&self) -> (Vec<Entity>, Vec<Relationship>) {
        let store = self.store.read();
        let mut entities: Vec<Entity> = store.entities.iter().cloned().collect();
        entities.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let mut relationships: Vec<Relationship> = store.relationships.iter().cloned().collect();
        relationships.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        (entities, relationships)
    }
}

impl Default for KnowledgeEngine {
    fn default() -> Self {
        Self::new()
    }
}
