//! Read-only queries over the graph: path finding, subgraph
//! extraction, structured filters, schema introspection and fact
//! verification
//!
//! Every function here takes the combined store by shared reference and
//! never mutates it; the engine facade holds the read lock for the
//! duration of one call, so each query sees a consistent point-in-time
//! view.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;

use crate::error::{GraphError, GraphResult};
use crate::types::{
    Entity, FactEvidence, FactVerification, GraphPath, GraphRecord, GraphSchema, QueryTarget,
    Relationship, StructuredQuery, Subgraph,
};
use crate::validation::validate_confidence;

use super::{CancelToken, GraphStore};

/// How many search hits to consider per statement term when verifying
/// a fact
const FACT_SEARCH_LIMIT: usize = 5;

/// How many search hits to consider per endpoint name when finding
/// connections
const CONNECTION_SEARCH_LIMIT: usize = 3;

/// Statement terms shorter than this carry too little signal to search
const FACT_TERM_MIN_CHARS: usize = 4;

/// All shortest paths from `source_id` to `target_id` within
/// `max_depth` hops
///
/// Breadth-first over the adjacency index: directed edges traverse
/// source to target only, bidirectional edges traverse both ways. When
/// several shortest paths exist they are all returned, in discovery
/// order. A path never revisits an entity.
pub(crate) fn find_path(
    store: &GraphStore,
    source_id: &str,
    target_id: &str,
    max_depth: usize,
) -> GraphResult<Vec<GraphPath>> {
    if store.entities.get(source_id).is_none() {
        return Err(GraphError::EntityNotFound(source_id.to_string()));
    }
    if store.entities.get(target_id).is_none() {
        return Err(GraphError::EntityNotFound(target_id.to_string()));
    }
    if source_id == target_id {
        return Ok(vec![materialize_path(store, &[source_id.to_string()], &[])]);
    }

    // partial paths: (current entity, entities so far, relationships so far)
    let mut frontier: Vec<(String, Vec<String>, Vec<String>)> =
        vec![(source_id.to_string(), vec![source_id.to_string()], Vec::new())];
    let mut best_depth: HashMap<String, usize> = HashMap::from([(source_id.to_string(), 0)]);
    let mut found: Vec<(Vec<String>, Vec<String>)> = Vec::new();

    for depth in 1..=max_depth {
        let mut next = Vec::new();
        for (current, nodes, rels) in &frontier {
            let Some(entry) = store.index.entry(current) else {
                continue;
            };
            for rel_id in entry.traversable() {
                let relationship = store.relationships.expect(rel_id);
                let neighbor = relationship.other_endpoint(current);
                if nodes.iter().any(|n| n == neighbor) {
                    continue;
                }
                // an entity reached at an earlier level cannot lie on a
                // shortest path through this one
                match best_depth.get(neighbor) {
                    Some(&d) if d < depth => continue,
                    _ => {
                        best_depth.entry(neighbor.to_string()).or_insert(depth);
                    }
                }
                let mut next_nodes = nodes.clone();
                next_nodes.push(neighbor.to_string());
                let mut next_rels = rels.clone();
                next_rels.push(rel_id.clone());
                if neighbor == target_id {
                    found.push((next_nodes, next_rels));
                } else {
                    next.push((neighbor.to_string(), next_nodes, next_rels));
                }
            }
        }
        if !found.is_empty() {
            // every shortest path was discovered at this level
            break;
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    Ok(found
        .into_iter()
        .map(|(nodes, rels)| materialize_path(store, &nodes, &rels))
        .collect())
}

/// Bounded neighborhood around `center_id`, up to `depth` hops in any
/// direction
///
/// Edges are followed regardless of direction; each node and edge
/// appears at most once. Cancellation is checked between levels and
/// yields a partial result flagged `truncated`.
pub(crate) fn entity_subgraph(
    store: &GraphStore,
    center_id: &str,
    depth: usize,
    cancel: Option<&CancelToken>,
) -> GraphResult<Subgraph> {
    let center = store
        .entities
        .get(center_id)
        .ok_or_else(|| GraphError::EntityNotFound(center_id.to_string()))?;

    let mut nodes = vec![center.clone()];
    let mut visited: HashSet<String> = HashSet::from([center_id.to_string()]);
    let mut edges: Vec<Relationship> = Vec::new();
    let mut edge_seen: HashSet<String> = HashSet::new();
    let mut frontier = vec![center_id.to_string()];
    let mut truncated = false;

    for _ in 0..depth {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            truncated = true;
            break;
        }
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for entity_id in &frontier {
            let Some(entry) = store.index.entry(entity_id) else {
                continue;
            };
            for rel_id in entry.all() {
                if !edge_seen.insert(rel_id.clone()) {
                    continue;
                }
                let relationship = store.relationships.expect(rel_id);
                edges.push(relationship.clone());
                let neighbor = relationship.other_endpoint(entity_id);
                if visited.insert(neighbor.to_string()) {
                    nodes.push(store.expect_entity(neighbor).clone());
                    next.push(neighbor.to_string());
                }
            }
        }
        frontier = next;
    }

    Ok(Subgraph {
        center: center_id.to_string(),
        nodes,
        edges,
        truncated,
    })
}

/// Evaluate a structured filter over entities or relationships
///
/// Predicates are combined with AND; `$name` string values resolve
/// through `params` before anything is matched, so a malformed query
/// never half-executes. Results are ordered by creation time (then id).
pub(crate) fn execute_query(
    store: &GraphStore,
    query: &StructuredQuery,
    params: &HashMap<String, Value>,
) -> GraphResult<Vec<GraphRecord>> {
    let mut predicates: Vec<(&str, Value)> = Vec::new();
    for (key, value) in &query.properties {
        let resolved = match value {
            Value::String(s) if s.starts_with('$') => params
                .get(&s[1..])
                .cloned()
                .ok_or_else(|| {
                    GraphError::Validation(format!("missing query parameter '{}'", &s[1..]))
                })?,
            other => other.clone(),
        };
        predicates.push((key.as_str(), resolved));
    }
    let type_filter = query.record_type.as_deref();

    let mut records: Vec<GraphRecord> = match query.target {
        QueryTarget::Entities => {
            let mut matches: Vec<&Entity> = store
                .entities
                .iter()
                .filter(|entity| {
                    type_filter.map_or(true, |t| entity.entity_type.eq_ignore_ascii_case(t))
                        && predicates.iter().all(|(key, expected)| {
                            entity
                                .properties
                                .get(*key)
                                .is_some_and(|p| &p.value == expected)
                        })
                })
                .collect();
            matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            matches
                .into_iter()
                .map(|e| GraphRecord::Entity(e.clone()))
                .collect()
        }
        QueryTarget::Relationships => {
            let mut matches: Vec<&Relationship> = store
                .relationships
                .iter()
                .filter(|rel| {
                    type_filter.map_or(true, |t| rel.relationship_type.eq_ignore_ascii_case(t))
                        && predicates.iter().all(|(key, expected)| {
                            rel.properties.get(*key).is_some_and(|p| &p.value == expected)
                        })
                })
                .collect();
            matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            matches
                .into_iter()
                .map(|r| GraphRecord::Relationship(r.clone()))
                .collect()
        }
    };

    if let Some(limit) = query.limit {
        records.truncate(limit);
    }
    Ok(records)
}

/// Distinct types and property keys currently present, sorted
pub(crate) fn schema(store: &GraphStore) -> GraphSchema {
    let mut entity_types = BTreeSet::new();
    let mut relationship_types = BTreeSet::new();
    let mut property_keys = BTreeSet::new();

    for entity in store.entities.iter() {
        entity_types.insert(entity.entity_type.clone());
        property_keys.extend(entity.properties.keys().cloned());
    }
    for relationship in store.relationships.iter() {
        relationship_types.insert(relationship.relationship_type.clone());
        property_keys.extend(relationship.properties.keys().cloned());
    }

    GraphSchema {
        entity_types: entity_types.into_iter().collect(),
        relationship_types: relationship_types.into_iter().collect(),
        property_keys: property_keys.into_iter().collect(),
    }
}

/// Check a statement against stored string property values
///
/// Entities matching the statement's longer terms are candidates; the
/// first property value that is contained in the statement with
/// confidence at or above the threshold verifies it.
pub(crate) fn verify_fact(
    store: &GraphStore,
    statement: &str,
    threshold: f64,
) -> GraphResult<FactVerification> {
    validate_confidence(threshold)?;
    let statement_lower = statement.to_lowercase();

    let mut candidates: Vec<Entity> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for term in statement
        .split_whitespace()
        .filter(|t| t.chars().count() >= FACT_TERM_MIN_CHARS)
    {
        for entity in store.entities.search(term, FACT_SEARCH_LIMIT) {
            if seen.insert(entity.id.clone()) {
                candidates.push(entity);
            }
        }
    }

    for entity in &candidates {
        for (key, value) in &entity.properties {
            let Some(text) = value.as_str() else { continue };
            if text.is_empty() || value.confidence < threshold {
                continue;
            }
            if statement_lower.contains(&text.to_lowercase()) {
                return Ok(FactVerification {
                    verified: true,
                    confidence: value.confidence,
                    evidence: Some(FactEvidence {
                        entity_id: entity.id.clone(),
                        entity_name: entity.name.clone(),
                        property: key.clone(),
                        value: text.to_string(),
                    }),
                });
            }
        }
    }

    Ok(FactVerification::unverified())
}

/// Find paths between entities resolved by name search
///
/// Each endpoint name resolves to its best search hits; identical
/// endpoint pairs are skipped.
pub(crate) fn find_connections(
    store: &GraphStore,
    name_a: &str,
    name_b: &str,
    max_depth: usize,
) -> GraphResult<Vec<GraphPath>> {
    let sources = store.entities.search(name_a, CONNECTION_SEARCH_LIMIT);
    let targets = store.entities.search(name_b, CONNECTION_SEARCH_LIMIT);

    let mut paths = Vec::new();
    for source in &sources {
        for target in &targets {
            if source.id == target.id {
                continue;
            }
            paths.extend(find_path(store, &source.id, &target.id, max_depth)?);
        }
    }
    Ok(paths)
}

/// Build the alternating entity/relationship segment list for a path
fn materialize_path(store: &GraphStore, nodes: &[String], rels: &[String]) -> GraphPath {
    let mut segments = Vec::with_capacity(nodes.len() + rels.len());
    for (i, node) in nodes.iter().enumerate() {
        segments.push(GraphRecord::Entity(store.expect_entity(node).clone()));
        if let Some(rel_id) = rels.get(i) {
            segments.push(GraphRecord::Relationship(
                store.relationships.expect(rel_id).clone(),
            ));
        }
    }
    GraphPath { segments }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::types::{EntityDraft, RelationshipDraft};

    use super::*;

    /// a -> b -> d, a -> c -> d, plus an undirected edge d -- e
    fn diamond() -> (GraphStore, Vec<String>) {
        let mut store = GraphStore::default();
        let ids: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|name| {
                store
                    .entities
                    .add(EntityDraft::new("concept", *name))
                    .unwrap()
            })
            .collect();
        for (from, to) in [(0, 1), (1, 3), (0, 2), (2, 3)] {
            store
                .relationships
                .add(
                    RelationshipDraft::new(&ids[from], "links_to", &ids[to]),
                    &store.entities,
                    &mut store.index,
                )
                .unwrap();
        }
        store
            .relationships
            .add(
                RelationshipDraft::new(&ids[3], "adjacent_to", &ids[4]).bidirectional(),
                &store.entities,
                &mut store.index,
            )
            .unwrap();
        (store, ids)
    }

    #[test]
    fn test_all_shortest_paths_returned() {
        let (store, ids) = diamond();
        let paths = find_path(&store, &ids[0], &ids[3], 5).unwrap();
        assert_eq!(paths.len(), 2);
        for path in &paths {
            assert_eq!(path.hops(), 2);
            assert_eq!(path.entity_ids().first(), Some(&ids[0].as_str()));
            assert_eq!(path.entity_ids().last(), Some(&ids[3].as_str()));
        }
    }

    #[test]
    fn test_direction_semantics() {
        let (store, ids) = diamond();
        // directed edges do not traverse target -> source
        assert!(find_path(&store, &ids[3], &ids[0], 5).unwrap().is_empty());
        // bidirectional edges traverse both ways
        let paths = find_path(&store, &ids[4], &ids[3], 1).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].hops(), 1);
    }

    #[test]
    fn test_depth_bound_respected() {
        let (store, ids) = diamond();
        assert!(find_path(&store, &ids[0], &ids[3], 1).unwrap().is_empty());
        assert!(find_path(&store, &ids[0], &ids[4], 2).unwrap().is_empty());
        assert_eq!(find_path(&store, &ids[0], &ids[4], 3).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_hop_path_to_self() {
        let (store, ids) = diamond();
        let paths = find_path(&store, &ids[0], &ids[0], 3).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].hops(), 0);
    }

    #[test]
    fn test_subgraph_depth_zero() {
        let (store, ids) = diamond();
        let subgraph = entity_subgraph(&store, &ids[0], 0, None).unwrap();
        assert_eq!(subgraph.nodes.len(), 1);
        assert!(subgraph.edges.is_empty());
        assert!(!subgraph.truncated);
    }

    #[test]
    fn test_subgraph_no_duplicates() {
        let (store, ids) = diamond();
        let subgraph = entity_subgraph(&store, &ids[0], 3, None).unwrap();

        let node_ids: HashSet<&str> = subgraph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids.len(), subgraph.nodes.len());
        let edge_ids: HashSet<&str> = subgraph.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids.len(), subgraph.edges.len());
        assert_eq!(subgraph.nodes.len(), 5);
        assert_eq!(subgraph.edges.len(), 5);
    }

    #[test]
    fn test_subgraph_ignores_edge_direction() {
        let (store, ids) = diamond();
        // d has only incoming directed edges plus the undirected one
        let subgraph = entity_subgraph(&store, &ids[3], 1, None).unwrap();
        assert_eq!(subgraph.nodes.len(), 4);
        assert_eq!(subgraph.edges.len(), 3);
    }

    #[test]
    fn test_subgraph_cancellation() {
        let (store, ids) = diamond();
        let token = CancelToken::new();
        token.cancel();
        let subgraph = entity_subgraph(&store, &ids[0], 3, Some(&token)).unwrap();
        assert!(subgraph.truncated);
        assert_eq!(subgraph.nodes.len(), 1);
        assert!(subgraph.edges.is_empty());
    }

    #[test]
    fn test_execute_query_with_params() {
        let (mut store, _) = diamond();
        store
            .entities
            .add(
                EntityDraft::new("person", "Ada Lovelace")
                    .with_property("occupation", "mathematician"),
            )
            .unwrap();

        let query = StructuredQuery::all(QueryTarget::Entities)
            .with_type("person")
            .with_property("occupation", json!("$job"));
        let params = HashMap::from([("job".to_string(), json!("mathematician"))]);

        let records = execute_query(&store, &query, &params).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0], GraphRecord::Entity(e) if e.name == "Ada Lovelace"));

        let missing = execute_query(&store, &query, &HashMap::new()).unwrap_err();
        assert!(matches!(missing, GraphError::Validation(_)));
    }

    #[test]
    fn test_schema_reflects_live_state() {
        let (mut store, _ids) = diamond();
        let before = schema(&store);
        assert_eq!(before.entity_types, vec!["concept".to_string()]);
        assert_eq!(
            before.relationship_types,
            vec!["adjacent_to".to_string(), "links_to".to_string()]
        );

        store
            .entities
            .add(EntityDraft::new("person", "Ada").with_property("born", "1815"))
            .unwrap();
        let after = schema(&store);
        assert_eq!(
            after.entity_types,
            vec!["concept".to_string(), "person".to_string()]
        );
        assert_eq!(after.property_keys, vec!["born".to_string()]);
    }

    #[test]
    fn test_verify_fact() {
        let (mut store, _) = diamond();
        store
            .entities
            .add(
                EntityDraft::new("person", "Ada Lovelace")
                    .with_property("occupation", "mathematician"),
            )
            .unwrap();

        let verdict =
            verify_fact(&store, "Ada Lovelace worked as a mathematician", 0.7).unwrap();
        assert!(verdict.verified);
        assert_eq!(verdict.evidence.as_ref().unwrap().property, "occupation");

        let unsupported = verify_fact(&store, "Ada Lovelace was an astronomer", 0.7).unwrap();
        assert!(!unsupported.verified);
    }
}
