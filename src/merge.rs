//! Last-write-wins merge of validated payloads into session state.

use crate::schema::VersionSchema;
use crate::types::{Payload, SessionState};

/// Folds a validated payload into `state`, producing the successor state.
///
/// For every field on the schema's allow-list: a non-null value in
/// `payload.fields` overwrites the prior value, while an absent or null
/// entry carries the existing value forward unchanged. Within one payload
/// the last write wins because keys are unique after parsing.
///
/// Keys outside the allow-list are ignored rather than trusted; the
/// validator already rejects payloads that contain any, so this only
/// matters for hand-built payloads. No coercion happens here and the input
/// state is never mutated.
#[must_use]
pub fn merge_payload(state: &SessionState, payload: &Payload, schema: &VersionSchema) -> SessionState {
    let mut next = state.clone();
    for name in schema.field_names() {
        if let Some(value) = payload.fields.get(name)
            && !value.is_null()
        {
            next.set(name, value.clone());
        }
    }
    next
}
