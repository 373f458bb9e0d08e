//! Confidence-weighted merge rules
//!
//! When two records describe the same logical identity the engine keeps
//! a single stored record and folds the incoming facts into it:
//!
//! - merged confidence is the max of the two
//! - for property keys present in both, the value with the higher
//!   per-value confidence wins; on a tie the existing value is kept
//! - alias sets are unioned (case-insensitive); an incoming name that
//!   differs from the stored canonical name becomes an alias
//! - `created_at` keeps the earlier record's value, `updated_at` the
//!   later's
//! - `source` becomes the most recent tag; prior tags stay recoverable
//!   in the `sources` history

use std::collections::BTreeMap;

use chrono::Utc;

use crate::types::{Entity, PropertyValue};

/// Fold an incoming property map into an existing one
pub(crate) fn merge_properties(
    existing: &mut BTreeMap<String, PropertyValue>,
    incoming: BTreeMap<String, PropertyValue>,
) {
    for (key, value) in incoming {
        match existing.get(&key) {
            Some(current) if current.confidence >= value.confidence => {}
            _ => {
                existing.insert(key, value);
            }
        }
    }
}

/// Fold an incoming entity draft (already validated and resolved) into
/// the stored entity it collided with
///
/// Returns the aliases that are new to the stored entity so the caller
/// can index them.
pub(crate) fn merge_entity(
    existing: &mut Entity,
    incoming_name: &str,
    incoming_aliases: Vec<String>,
    incoming_properties: BTreeMap<String, PropertyValue>,
    incoming_confidence: f64,
    incoming_source: String,
) -> Vec<String> {
    existing.confidence = existing.confidence.max(incoming_confidence);
    merge_properties(&mut existing.properties, incoming_properties);

    let mut added = Vec::new();
    for candidate in std::iter::once(incoming_name.to_string()).chain(incoming_aliases) {
        if existing.answers_to(&candidate) || added.iter().any(|a: &String| a.eq_ignore_ascii_case(&candidate)) {
            continue;
        }
        added.push(candidate);
    }
    existing.aliases.extend(added.iter().cloned());

    if existing.sources.last() != Some(&incoming_source) {
        existing.sources.push(incoming_source.clone());
    }
    existing.source = incoming_source;
    existing.updated_at = Utc::now();

    added
}
