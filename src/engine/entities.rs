//! Entity storage with a name/alias index and merge-on-collision
//!
//! Entities are keyed by id. A secondary index maps
//! `(lowercased type, lowercased name-or-alias)` to the owning id and
//! enforces the uniqueness invariant: within one entity type, a name or
//! alias identifies at most one entity. An add that collides through
//! the index merges into the existing entity instead of inserting.

use std::collections::HashMap;

use chrono::Utc;
use rayon::prelude::*;
use uuid::Uuid;

use crate::error::{GraphError, GraphResult};
use crate::types::{resolve_properties, Entity, EntityDraft, EntityPatch};
use crate::validation::{validate_confidence, validate_entity_type, validate_non_empty};

use super::merge;

/// Entity count above which search scans in parallel
const PARALLEL_SEARCH_THRESHOLD: usize = 1000;

fn index_key(entity_type: &str, name: &str) -> (String, String) {
    (entity_type.to_lowercase(), name.to_lowercase())
}

/// Keyed entity storage plus the per-type name/alias index
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: HashMap<String, Entity>,
    /// (lowercased type, lowercased name or alias) -> entity id
    name_index: HashMap<(String, String), String>,
}

impl EntityStore {
    /// Add an entity, merging into an existing one when the draft's
    /// name or an alias already identifies an entity of the same type
    ///
    /// Returns the id of the stored entity (existing on merge, freshly
    /// minted otherwise).
    pub fn add(&mut self, draft: EntityDraft) -> GraphResult<String> {
        validate_non_empty("entity name", &draft.name)?;
        validate_non_empty("entity type", &draft.entity_type)?;
        validate_confidence(draft.confidence)?;
        if let Some(warning) = validate_entity_type(&draft.entity_type) {
            tracing::debug!(%warning, "accepting open-set entity type");
        }

        // dedupe draft aliases against the name and each other
        let mut aliases: Vec<String> = Vec::new();
        for alias in &draft.aliases {
            validate_non_empty("alias", alias)?;
            if alias.eq_ignore_ascii_case(&draft.name)
                || aliases.iter().any(|a| a.eq_ignore_ascii_case(alias))
            {
                continue;
            }
            aliases.push(alias.clone());
        }
        let properties = resolve_properties(draft.properties, draft.confidence)?;

        // canonical name takes precedence over aliases when both match
        let existing_id = self
            .lookup(&draft.entity_type, &draft.name)
            .or_else(|| {
                aliases
                    .iter()
                    .find_map(|alias| self.lookup(&draft.entity_type, alias))
            })
            .map(String::from);

        if let Some(id) = existing_id {
            let entity = self
                .entities
                .get_mut(&id)
                .unwrap_or_else(|| panic!("name index references missing entity {id}"));
            let added = merge::merge_entity(
                entity,
                &draft.name,
                aliases,
                properties,
                draft.confidence,
                draft.source,
            );
            let entity_type = entity.entity_type.clone();
            for alias in &added {
                self.name_index
                    .insert(index_key(&entity_type, alias), id.clone());
            }
            return Ok(id);
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let entity = Entity {
            id: id.clone(),
            entity_type: draft.entity_type,
            name: draft.name,
            aliases,
            properties,
            confidence: draft.confidence,
            source: draft.source.clone(),
            sources: vec![draft.source],
            created_at: now,
            updated_at: now,
        };
        self.index_names(&entity);
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Look up an entity by id
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Whether an entity with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Resolve a name or alias to an entity id within one type
    /// (case-insensitive)
    pub fn lookup(&self, entity_type: &str, name: &str) -> Option<&str> {
        self.name_index
            .get(&index_key(entity_type, name))
            .map(String::as_str)
    }

    /// Case-insensitive substring search over names, aliases and string
    /// property values
    ///
    /// Results are ordered by confidence descending, ties broken by
    /// earlier `created_at` (then id, for a total order), truncated to
    /// `limit`. Large stores are scanned in parallel.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entity> {
        let needle = query.to_lowercase();

        let mut matches: Vec<Entity> = if self.entities.len() > PARALLEL_SEARCH_THRESHOLD {
            self.entities
                .par_iter()
                .filter(|(_, e)| e.matches_text(&needle))
                .map(|(_, e)| e.clone())
                .collect()
        } else {
            self.entities
                .values()
                .filter(|e| e.matches_text(&needle))
                .cloned()
                .collect()
        };

        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        matches
    }

    /// Apply a patch to an existing entity, bumping `updated_at`
    ///
    /// Alias additions are validated against the uniqueness invariant
    /// before anything is mutated.
    pub fn update(&mut self, id: &str, patch: EntityPatch) -> GraphResult<Entity> {
        if let Some(confidence) = patch.confidence {
            validate_confidence(confidence)?;
        }
        let Some(entity) = self.entities.get(id) else {
            return Err(GraphError::EntityNotFound(id.to_string()));
        };
        let entity_type = entity.entity_type.clone();

        let mut added: Vec<String> = Vec::new();
        for alias in &patch.add_aliases {
            validate_non_empty("alias", alias)?;
            if entity.answers_to(alias) || added.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
                continue;
            }
            if let Some(owner) = self.lookup(&entity_type, alias) {
                if owner != id {
                    return Err(GraphError::Validation(format!(
                        "alias '{alias}' already identifies another {entity_type} entity"
                    )));
                }
            }
            added.push(alias.clone());
        }

        let default_confidence = patch.confidence.unwrap_or(entity.confidence);
        let set_properties = resolve_properties(patch.set_properties, default_confidence)?;

        let entity = self
            .entities
            .get_mut(id)
            .unwrap_or_else(|| unreachable!("entity {id} existed above"));

        if let Some(confidence) = patch.confidence {
            entity.confidence = confidence;
        }
        for alias in &patch.remove_aliases {
            entity.aliases.retain(|a| !a.eq_ignore_ascii_case(alias));
        }
        entity.aliases.extend(added.iter().cloned());
        for (key, value) in set_properties {
            entity.properties.insert(key, value);
        }
        for key in &patch.remove_properties {
            entity.properties.remove(key);
        }
        if let Some(source) = patch.source {
            if entity.sources.last() != Some(&source) {
                entity.sources.push(source.clone());
            }
            entity.source = source;
        }
        entity.updated_at = Utc::now();
        let updated = entity.clone();

        for alias in &patch.remove_aliases {
            let key = index_key(&entity_type, alias);
            if self.name_index.get(&key).is_some_and(|owner| owner == id) {
                self.name_index.remove(&key);
            }
        }
        for alias in &added {
            self.name_index
                .insert(index_key(&entity_type, alias), id.to_string());
        }

        Ok(updated)
    }

    /// Remove an entity and its index entries
    ///
    /// Relationship cascade is the caller's responsibility.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        for name in std::iter::once(&entity.name).chain(entity.aliases.iter()) {
            let key = index_key(&entity.entity_type, name);
            if self.name_index.get(&key).is_some_and(|owner| owner == id) {
                self.name_index.remove(&key);
            }
        }
        Some(entity)
    }

    /// Insert a fully-formed entity loaded from a snapshot
    ///
    /// Invariants are re-validated; collisions are errors rather than
    /// merges, since snapshot content is expected to already be merged.
    pub(crate) fn insert_loaded(&mut self, mut entity: Entity) -> GraphResult<()> {
        validate_non_empty("entity name", &entity.name)?;
        validate_non_empty("entity type", &entity.entity_type)?;
        validate_confidence(entity.confidence)?;
        // a single-entry provenance history is elided on serialization
        if entity.sources.is_empty() {
            entity.sources = vec![entity.source.clone()];
        }
        if self.entities.contains_key(&entity.id) {
            return Err(GraphError::Validation(format!(
                "duplicate entity id {}",
                entity.id
            )));
        }
        for name in std::iter::once(&entity.name).chain(entity.aliases.iter()) {
            if self.lookup(&entity.entity_type, name).is_some() {
                return Err(GraphError::Validation(format!(
                    "name '{name}' already identifies another {} entity",
                    entity.entity_type
                )));
            }
        }
        self.index_names(&entity);
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Iterate over all stored entities (arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn index_names(&mut self, entity: &Entity) {
        self.name_index.insert(
            index_key(&entity.entity_type, &entity.name),
            entity.id.clone(),
        );
        for alias in &entity.aliases {
            self.name_index
                .insert(index_key(&entity.entity_type, alias), entity.id.clone());
        }
    }
}
