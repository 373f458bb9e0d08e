//! Adjacency index over the relationship store
//!
//! Maintains, per entity id, the set of relationship ids where the
//! entity is the source, the set where it is the target, and the set of
//! bidirectional relationships touching it. The index is mutated only
//! by relationship-store mutations under the engine write lock, so it
//! is always consistent with the stored relationships; queries read it
//! and never change it.
//!
//! Buckets are ordered sets, which keeps traversal discovery order
//! deterministic for a given graph.

use std::collections::{BTreeSet, HashMap};

use crate::types::Relationship;

/// Per-entity relationship-id buckets, split by direction
#[derive(Debug, Clone, Default)]
pub struct AdjacencyEntry {
    pub outgoing: BTreeSet<String>,
    pub incoming: BTreeSet<String>,
    pub bidirectional: BTreeSet<String>,
}

impl AdjacencyEntry {
    fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty() && self.bidirectional.is_empty()
    }

    /// Relationship ids traversable away from this entity: directed
    /// edges where it is the source, plus bidirectional edges
    pub fn traversable(&self) -> impl Iterator<Item = &String> {
        self.outgoing.iter().chain(self.bidirectional.iter())
    }

    /// Every relationship id touching this entity, regardless of
    /// direction
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.outgoing
            .iter()
            .chain(self.incoming.iter())
            .chain(self.bidirectional.iter())
    }

    /// Number of relationship ids across all buckets
    pub fn degree(&self) -> usize {
        self.outgoing.len() + self.incoming.len() + self.bidirectional.len()
    }
}

/// Adjacency structure derived from the relationship store
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    entries: HashMap<String, AdjacencyEntry>,
}

impl GraphIndex {
    /// Record a relationship in the buckets implied by its endpoints
    /// and its bidirectional flag
    pub fn add(&mut self, relationship: &Relationship) {
        if relationship.bidirectional {
            self.entries
                .entry(relationship.source_id.clone())
                .or_default()
                .bidirectional
                .insert(relationship.id.clone());
            self.entries
                .entry(relationship.target_id.clone())
                .or_default()
                .bidirectional
                .insert(relationship.id.clone());
        } else {
            self.entries
                .entry(relationship.source_id.clone())
                .or_default()
                .outgoing
                .insert(relationship.id.clone());
            self.entries
                .entry(relationship.target_id.clone())
                .or_default()
                .incoming
                .insert(relationship.id.clone());
        }
    }

    /// Remove a relationship from every bucket it occupies; entries
    /// left empty are dropped
    pub fn remove(&mut self, relationship: &Relationship) {
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if let Some(entry) = self.entries.get_mut(endpoint) {
                entry.outgoing.remove(&relationship.id);
                entry.incoming.remove(&relationship.id);
                entry.bidirectional.remove(&relationship.id);
                if entry.is_empty() {
                    self.entries.remove(endpoint);
                }
            }
        }
    }

    /// Drop the entry for a deleted entity; the caller must have
    /// removed its relationships first
    pub fn remove_entity(&mut self, entity_id: &str) {
        self.entries.remove(entity_id);
    }

    /// The adjacency buckets for an entity, if it has any
    /// relationships; O(1) amortized
    pub fn entry(&self, entity_id: &str) -> Option<&AdjacencyEntry> {
        self.entries.get(entity_id)
    }

    /// Every relationship id touching an entity, deduplicated (a
    /// directed self-loop occupies two buckets), in deterministic order
    pub fn touching(&self, entity_id: &str) -> Vec<String> {
        self.entries
            .get(entity_id)
            .map(|entry| {
                entry
                    .all()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entities with at least one relationship
    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }
}
