//! Relationship storage with endpoint validation
//!
//! Relationships are keyed by id. Mutations update the adjacency index
//! in the same call, so the index and the store never disagree while
//! the engine write lock is held. A duplicate edge (same endpoints and
//! type) is folded into the stored record instead of being duplicated.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{GraphError, GraphResult};
use crate::types::{resolve_properties, Direction, Relationship, RelationshipDraft};
use crate::validation::{validate_confidence, validate_non_empty};

use super::index::GraphIndex;
use super::merge;
use super::EntityStore;

fn edge_key(source_id: &str, target_id: &str, relationship_type: &str) -> (String, String, String) {
    (
        source_id.to_string(),
        target_id.to_string(),
        relationship_type.to_lowercase(),
    )
}

/// Keyed relationship storage plus the duplicate-edge index
#[derive(Debug, Clone, Default)]
pub struct RelationshipStore {
    relationships: HashMap<String, Relationship>,
    /// (source id, target id, lowercased type) -> relationship id
    edge_index: HashMap<(String, String, String), String>,
}

impl RelationshipStore {
    /// Add a relationship, validating both endpoints against the
    /// entity store and updating the adjacency index
    ///
    /// A duplicate of an existing edge merges into it: confidence takes
    /// the max, properties merge by per-value confidence, and the
    /// existing id is returned. The stored edge's direction semantics
    /// are fixed by its first writer.
    pub fn add(
        &mut self,
        draft: RelationshipDraft,
        entities: &EntityStore,
        index: &mut GraphIndex,
    ) -> GraphResult<String> {
        validate_non_empty("relationship type", &draft.relationship_type)?;
        validate_confidence(draft.confidence)?;
        if !entities.contains(&draft.source_id) {
            return Err(GraphError::Validation(format!(
                "source entity {} does not exist",
                draft.source_id
            )));
        }
        if !entities.contains(&draft.target_id) {
            return Err(GraphError::Validation(format!(
                "target entity {} does not exist",
                draft.target_id
            )));
        }
        let properties = resolve_properties(draft.properties, draft.confidence)?;

        let key = edge_key(&draft.source_id, &draft.target_id, &draft.relationship_type);
        if let Some(id) = self.edge_index.get(&key) {
            let id = id.clone();
            let relationship = self
                .relationships
                .get_mut(&id)
                .unwrap_or_else(|| panic!("edge index references missing relationship {id}"));
            relationship.confidence = relationship.confidence.max(draft.confidence);
            merge::merge_properties(&mut relationship.properties, properties);
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        let relationship = Relationship {
            id: id.clone(),
            relationship_type: draft.relationship_type,
            source_id: draft.source_id,
            target_id: draft.target_id,
            properties,
            confidence: draft.confidence,
            bidirectional: draft.bidirectional,
            source: draft.source,
            created_at: Utc::now(),
        };
        index.add(&relationship);
        self.edge_index.insert(key, id.clone());
        self.relationships.insert(id.clone(), relationship);
        Ok(id)
    }

    /// Look up a relationship by id
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    /// Relationships touching an entity, each paired with the id of the
    /// connected entity
    ///
    /// Bidirectional relationships are direction-agnostic and returned
    /// for every requested direction.
    pub fn relationships_for(
        &self,
        entity_id: &str,
        direction: Direction,
        index: &GraphIndex,
    ) -> Vec<(Relationship, String)> {
        let Some(entry) = index.entry(entity_id) else {
            return Vec::new();
        };

        let mut buckets: Vec<&BTreeSet<String>> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            buckets.push(&entry.outgoing);
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            buckets.push(&entry.incoming);
        }
        buckets.push(&entry.bidirectional);

        // a directed self-loop occupies two buckets; dedup by id
        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();
        for ids in buckets {
            for id in ids {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                let relationship = self.expect(id);
                let connected = relationship.other_endpoint(entity_id).to_string();
                results.push((relationship.clone(), connected));
            }
        }

        results
    }

    /// Remove a relationship from the store and the adjacency index
    pub fn remove(&mut self, id: &str, index: &mut GraphIndex) -> Option<Relationship> {
        let relationship = self.relationships.remove(id)?;
        self.edge_index.remove(&edge_key(
            &relationship.source_id,
            &relationship.target_id,
            &relationship.relationship_type,
        ));
        index.remove(&relationship);
        Some(relationship)
    }

    /// Remove every relationship touching an entity (cascade for entity
    /// deletion), dropping the entity's adjacency entry afterwards
    pub fn remove_touching(&mut self, entity_id: &str, index: &mut GraphIndex) -> Vec<Relationship> {
        let mut removed = Vec::new();
        for id in index.touching(entity_id) {
            match self.remove(&id, index) {
                Some(relationship) => removed.push(relationship),
                None => panic!("graph index references missing relationship {id}"),
            }
        }
        index.remove_entity(entity_id);
        removed
    }

    /// Insert a fully-formed relationship loaded from a snapshot
    pub(crate) fn insert_loaded(
        &mut self,
        relationship: Relationship,
        entities: &EntityStore,
        index: &mut GraphIndex,
    ) -> GraphResult<()> {
        validate_non_empty("relationship type", &relationship.relationship_type)?;
        validate_confidence(relationship.confidence)?;
        if self.relationships.contains_key(&relationship.id) {
            return Err(GraphError::Validation(format!(
                "duplicate relationship id {}",
                relationship.id
            )));
        }
        if !entities.contains(&relationship.source_id) {
            return Err(GraphError::Validation(format!(
                "relationship {} references unknown source entity {}",
                relationship.id, relationship.source_id
            )));
        }
        if !entities.contains(&relationship.target_id) {
            return Err(GraphError::Validation(format!(
                "relationship {} references unknown target entity {}",
                relationship.id, relationship.target_id
            )));
        }
        index.add(&relationship);
        self.edge_index.insert(
            edge_key(
                &relationship.source_id,
                &relationship.target_id,
                &relationship.relationship_type,
            ),
            relationship.id.clone(),
        );
        self.relationships
            .insert(relationship.id.clone(), relationship);
        Ok(())
    }

    /// Fetch a relationship the index claims exists; disagreement is a
    /// broken invariant
    pub(crate) fn expect(&self, id: &str) -> &Relationship {
        self.relationships
            .get(id)
            .unwrap_or_else(|| panic!("graph index references missing relationship {id}"))
    }

    /// Iterate over all stored relationships (arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Number of stored relationships
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the store holds no relationships
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::types::EntityDraft;

    use super::*;

    fn stores() -> (EntityStore, RelationshipStore, GraphIndex, String, String) {
        let mut entities = EntityStore::default();
        let ada = entities.add(EntityDraft::new("person", "Ada")).unwrap();
        let babbage = entities.add(EntityDraft::new("person", "Babbage")).unwrap();
        (entities, RelationshipStore::default(), GraphIndex::default(), ada, babbage)
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let (entities, mut store, mut index, ada, _) = stores();
        let err = store
            .add(
                RelationshipDraft::new(&ada, "knows", "missing"),
                &entities,
                &mut index,
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_edge_merges() {
        let (entities, mut store, mut index, ada, babbage) = stores();
        let first = store
            .add(
                RelationshipDraft::new(&ada, "knows", &babbage).with_confidence(0.5),
                &entities,
                &mut index,
            )
            .unwrap();
        let second = store
            .add(
                RelationshipDraft::new(&ada, "KNOWS", &babbage).with_confidence(0.8),
                &entities,
                &mut index,
            )
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first).unwrap().confidence, 0.8);
    }

    #[test]
    fn test_bidirectional_returned_for_any_direction() {
        let (entities, mut store, mut index, ada, babbage) = stores();
        store
            .add(
                RelationshipDraft::new(&ada, "collaborated_with", &babbage).bidirectional(),
                &entities,
                &mut index,
            )
            .unwrap();

        for direction in [Direction::Outgoing, Direction::Incoming, Direction::Both] {
            let related = store.relationships_for(&babbage, direction, &index);
            assert_eq!(related.len(), 1);
            assert_eq!(related[0].1, ada);
        }
    }

    #[test]
    fn test_directed_respects_direction_filter() {
        let (entities, mut store, mut index, ada, babbage) = stores();
        store
            .add(
                RelationshipDraft::new(&ada, "mentored", &babbage),
                &entities,
                &mut index,
            )
            .unwrap();

        assert_eq!(store.relationships_for(&ada, Direction::Outgoing, &index).len(), 1);
        assert!(store.relationships_for(&ada, Direction::Incoming, &index).is_empty());
        assert_eq!(store.relationships_for(&babbage, Direction::Incoming, &index).len(), 1);
        assert!(store.relationships_for(&babbage, Direction::Outgoing, &index).is_empty());
    }

    #[test]
    fn test_remove_touching_cascades() {
        let (mut entities, mut store, mut index, ada, babbage) = stores();
        let lab = entities.add(EntityDraft::new("organization", "Analytical Society")).unwrap();
        store
            .add(RelationshipDraft::new(&ada, "member_of", &lab), &entities, &mut index)
            .unwrap();
        store
            .add(RelationshipDraft::new(&babbage, "member_of", &lab), &entities, &mut index)
            .unwrap();

        let removed = store.remove_touching(&lab, &mut index);
        assert_eq!(removed.len(), 2);
        assert!(store.is_empty());
        assert!(index.entry(&lab).is_none());
        assert!(index.entry(&ada).is_none());
    }
}
