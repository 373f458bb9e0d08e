//! # factgraph
//!
//! An in-memory knowledge graph engine: a store of typed entities and
//! typed relationships between them, with search, traversal, and
//! confidence-weighted fact merging.
//!
//! # Features
//!
//! - **Entity resolution**: adding an entity whose name or alias
//!   collides with an existing one of the same type merges the two,
//!   keeping the better-supported facts
//! - **Adjacency index**: relationship lookups and neighbor expansion
//!   are O(1) amortized per entity, O(degree) per expansion
//! - **Traversal**: all-shortest-path search and bounded subgraph
//!   extraction with explicit depth ceilings and cooperative
//!   cancellation
//! - **Structured queries**: AND-combined equality filters over types
//!   and property keys, the target for external query translators
//! - **Thread-safe**: many concurrent readers, one writer at a time,
//!   around the combined store triple
//! - **Snapshots**: optional JSONL snapshot load/save with atomic
//!   writes
//!
//! # Modules
//!
//! - `types`: core data structures (Entity, Relationship, drafts,
//!   paths, queries, schema)
//! - `engine`: the engine facade, stores, adjacency index and queries
//! - `error`: typed error taxonomy
//! - `validation`: input validation helpers
//!
//! # Example
//!
//! ```no_run
//! use factgraph::{EntityDraft, GraphResult, KnowledgeEngine, RelationshipDraft};
//!
//! fn main() -> GraphResult<()> {
//!     let engine = KnowledgeEngine::new();
//!     engine.initialize()?;
//!
//!     let ada = engine.add_entity(EntityDraft::new("person", "Ada Lovelace"))?;
//!     let babbage = engine.add_entity(EntityDraft::new("person", "Charles Babbage"))?;
//!     engine.add_relationship(
//!         RelationshipDraft::new(&ada, "collaborated_with", &babbage).bidirectional(),
//!     )?;
//!
//!     let paths = engine.find_path(&babbage, &ada, Some(1))?;
//!     assert_eq!(paths.len(), 1);
//!
//!     engine.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use engine::{
    CancelToken, EngineConfig, EngineState, EngineStatus, KnowledgeEngine,
    DEFAULT_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH,
};
pub use error::{GraphError, GraphResult};
pub use types::{
    Direction, Entity, EntityDraft, EntityPatch, FactVerification, GraphPath, GraphRecord,
    GraphSchema, PropertyInput, PropertyValue, QueryTarget, Relationship, RelationshipDraft,
    StructuredQuery, Subgraph,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
