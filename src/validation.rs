//! Input validation for entities and relationships

use crate::error::{GraphError, GraphResult};

/// Well-known entity types; the set is open, these are advisory
pub const STANDARD_ENTITY_TYPES: &[&str] = &[
    "person",
    "organization",
    "location",
    "concept",
    "event",
    "product",
    "technology",
    "generic",
];

/// Check that a confidence score is a finite value in [0.0, 1.0]
///
/// Out-of-range values are rejected, never clamped.
pub fn validate_confidence(value: f64) -> GraphResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(GraphError::Validation(format!(
            "confidence must be within [0.0, 1.0], got {value}"
        )));
    }
    Ok(())
}

/// Check that a required name-like field is non-empty after trimming
pub fn validate_non_empty(field: &str, value: &str) -> GraphResult<()> {
    if value.trim().is_empty() {
        return Err(GraphError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Check if an entity type is one of the well-known ones, returning a
/// warning message if not
pub fn validate_entity_type(entity_type: &str) -> Option<String> {
    if STANDARD_ENTITY_TYPES
        .iter()
        .any(|&t| t.eq_ignore_ascii_case(entity_type))
    {
        None
    } else {
        Some(format!(
            "non-standard entity type '{entity_type}', known types: {STANDARD_ENTITY_TYPES:?}"
        ))
    }
}
