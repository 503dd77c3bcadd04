//! Completion gating over accumulated session state.

use crate::schema::VersionSchema;
use crate::types::SessionState;

/// Whether `state` holds a valid value for every completion field of the
/// schema.
///
/// Derived from scratch on every call. Each required field must be present
/// and must still pass its constraint check: state assembled across many
/// partial merges, or seeded out of band, is re-checked rather than trusted
/// at read time.
#[must_use]
pub fn is_complete(state: &SessionState, schema: &VersionSchema) -> bool {
    missing_fields(state, schema).is_empty()
}

/// Names of completion fields that are absent from `state` or no longer
/// pass their constraint check, in the schema's declaration order.
///
/// Useful for prompting the model toward what a quote still needs.
#[must_use]
pub fn missing_fields<'a>(state: &SessionState, schema: &'a VersionSchema) -> Vec<&'a str> {
    schema
        .required_fields()
        .filter(|spec| {
            !state
                .get(&spec.name)
                .is_some_and(|value| spec.check(value).is_ok())
        })
        .map(|spec| spec.name.as_str())
        .collect()
}
