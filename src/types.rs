//! Core wire and state types for quote updates.
//!
//! [`Payload`] is the structured update proposal recovered from assistant
//! text; [`SessionState`] is the accumulated, validated field store it merges
//! into. Wire keys are camelCase (`schemaVersion`, `quoteId`) to match the
//! payload contract the model is prompted to emit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single typed field value as it appears in payloads and session state.
///
/// JSON scalars map directly: numbers to `Number`, strings to `Text`,
/// booleans to `Bool`, and `null` to `Null`. Arrays and objects are not
/// representable; the validator rejects them before construction.
///
/// A `Null` is a "no change" marker. It passes validation for any known
/// field and is skipped by the merger, so it never lands in
/// [`SessionState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON `null`: present but explicitly empty.
    Null,
    /// JSON boolean. Accepted in `metadata`; no quote field is boolean.
    Bool(bool),
    /// JSON number. Integers and floats both map here.
    Number(f64),
    /// JSON string.
    Text(String),
}

impl FieldValue {
    /// Whether this is the `null` no-change marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The structured update proposal recovered from assistant text.
///
/// Instances are normally produced by the validator, which guarantees every
/// field passed its schema constraints. Hand-built payloads carry no such
/// guarantee; the merger and completeness checker stay safe against them by
/// ignoring unknown keys and re-checking values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Payload discriminator; equals the registry's payload type.
    #[serde(rename = "type")]
    pub payload_type: String,

    /// Declared schema version the fields were validated against.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    /// Optional quote identifier the update refers to.
    #[serde(rename = "quoteId", default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,

    /// Proposed field updates, keyed by allow-listed field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,

    /// Auxiliary metadata (bounded key set, scalar values). Never merged
    /// into session state.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, FieldValue>,
}

impl Payload {
    /// Creates an empty payload with the given discriminator and version.
    pub fn new(payload_type: impl Into<String>, schema_version: u32) -> Self {
        Self {
            payload_type: payload_type.into(),
            schema_version,
            quote_id: None,
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds one proposed field update.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets the quote identifier.
    #[must_use]
    pub fn with_quote_id(mut self, quote_id: impl Into<String>) -> Self {
        self.quote_id = Some(quote_id.into());
        self
    }

    /// Names of the fields this payload proposes, in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Accumulated, validated field values for one conversation.
///
/// Values only enter through the merger, strictly after validation, and the
/// state is never rolled back: merges only move it forward. Serializes as a
/// flat JSON object so persisted sessions stay human-readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(flatten)]
    values: BTreeMap<String, FieldValue>,
}

impl SessionState {
    /// Creates an empty session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Stores `value` under `name`, replacing any prior value.
    ///
    /// Callers seeding state directly bypass validation; the completeness
    /// checker re-checks every value it reads, so stale or out-of-band
    /// entries cannot fake completion.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Whether a value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no fields are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored field names, in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Stored `(name, value)` pairs, in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Names of fields whose value differs from `previous` (new or
    /// updated), in sorted order.
    #[must_use]
    pub fn changed_from(&self, previous: &SessionState) -> Vec<String> {
        self.iter()
            .filter(|&(name, value)| previous.get(name) != Some(value))
            .map(|(name, _)| name.to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── FieldValue ───────────────────────────────────────────────────────

    #[test]
    fn field_value_deserializes_untagged() {
        let number: FieldValue = match serde_json::from_str("42.5") {
            Ok(v) => v,
            Err(e) => unreachable!("number should parse: {e}"),
        };
        assert_eq!(number, FieldValue::Number(42.5));

        let text: FieldValue = match serde_json::from_str("\"Indoor\"") {
            Ok(v) => v,
            Err(e) => unreachable!("string should parse: {e}"),
        };
        assert_eq!(text, FieldValue::Text("Indoor".into()));

        let null: FieldValue = match serde_json::from_str("null") {
            Ok(v) => v,
            Err(e) => unreachable!("null should parse: {e}"),
        };
        assert!(null.is_null());

        let flag: FieldValue = match serde_json::from_str("true") {
            Ok(v) => v,
            Err(e) => unreachable!("bool should parse: {e}"),
        };
        assert_eq!(flag, FieldValue::Bool(true));
    }

    #[test]
    fn field_value_serializes_to_bare_scalars() {
        let json = match serde_json::to_string(&FieldValue::Number(40.0)) {
            Ok(j) => j,
            Err(e) => unreachable!("serialize failed: {e}"),
        };
        assert_eq!(json, "40.0");

        let json = match serde_json::to_string(&FieldValue::Null) {
            Ok(j) => j,
            Err(e) => unreachable!("serialize failed: {e}"),
        };
        assert_eq!(json, "null");
    }

    #[test]
    fn field_value_accessors() {
        assert_eq!(FieldValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(FieldValue::Text("hi".into()).as_str(), Some("hi"));
        assert!(FieldValue::Text("hi".into()).as_number().is_none());
        assert!(FieldValue::Number(1.0).as_str().is_none());
        assert!(!FieldValue::Number(0.0).is_null());
    }

    #[test]
    fn field_value_from_conversions() {
        assert_eq!(FieldValue::from(2.0), FieldValue::Number(2.0));
        assert_eq!(FieldValue::from("x"), FieldValue::Text("x".into()));
        assert_eq!(FieldValue::from(true), FieldValue::Bool(true));
    }

    // ── Payload ──────────────────────────────────────────────────────────

    #[test]
    fn payload_deserializes_camel_case_wire_keys() {
        let json = r#"{
            "type": "anc_quote_update",
            "schemaVersion": 1,
            "quoteId": "Q-1001",
            "fields": {"width": 40, "environment": "Indoor"}
        }"#;
        let payload: Payload = match serde_json::from_str(json) {
            Ok(p) => p,
            Err(e) => unreachable!("payload should parse: {e}"),
        };
        assert_eq!(payload.payload_type, "anc_quote_update");
        assert_eq!(payload.schema_version, 1);
        assert_eq!(payload.quote_id.as_deref(), Some("Q-1001"));
        assert_eq!(payload.fields.get("width"), Some(&FieldValue::Number(40.0)));
    }

    #[test]
    fn payload_optional_members_default_empty() {
        let json = r#"{"type": "anc_quote_update", "schemaVersion": 1}"#;
        let payload: Payload = match serde_json::from_str(json) {
            Ok(p) => p,
            Err(e) => unreachable!("payload should parse: {e}"),
        };
        assert!(payload.quote_id.is_none());
        assert!(payload.fields.is_empty());
        assert!(payload.metadata.is_empty());
    }

    #[test]
    fn payload_serializes_with_wire_names() {
        let payload = Payload::new("anc_quote_update", 1)
            .with_quote_id("Q-7")
            .with_field("width", 40.0);
        let json = match serde_json::to_string(&payload) {
            Ok(j) => j,
            Err(e) => unreachable!("serialize failed: {e}"),
        };
        assert!(json.contains("\"type\":\"anc_quote_update\""));
        assert!(json.contains("\"schemaVersion\":1"));
        assert!(json.contains("\"quoteId\":\"Q-7\""));
        assert!(!json.contains("payload_type"));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn payload_builder_collects_fields() {
        let payload = Payload::new("anc_quote_update", 1)
            .with_field("width", 40.0)
            .with_field("environment", "Indoor");
        let names: Vec<&str> = payload.field_names().collect();
        assert_eq!(names, vec!["environment", "width"]);
    }

    // ── SessionState ─────────────────────────────────────────────────────

    #[test]
    fn session_state_set_and_get() {
        let mut state = SessionState::new();
        assert!(state.is_empty());
        state.set("width", 40.0);
        assert!(state.contains("width"));
        assert_eq!(state.get("width"), Some(&FieldValue::Number(40.0)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn session_state_set_overwrites() {
        let mut state = SessionState::new();
        state.set("width", 40.0);
        state.set("width", 50.0);
        assert_eq!(state.get("width"), Some(&FieldValue::Number(50.0)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn session_state_serializes_flat() {
        let mut state = SessionState::new();
        state.set("width", 40.0);
        state.set("environment", "Indoor");
        let json = match serde_json::to_string(&state) {
            Ok(j) => j,
            Err(e) => unreachable!("serialize failed: {e}"),
        };
        assert_eq!(json, r#"{"environment":"Indoor","width":40.0}"#);

        let back: SessionState = match serde_json::from_str(&json) {
            Ok(s) => s,
            Err(e) => unreachable!("deserialize failed: {e}"),
        };
        assert_eq!(back, state);
    }

    #[test]
    fn iter_yields_sorted_pairs() {
        let mut state = SessionState::new();
        state.set("width", 40.0);
        state.set("environment", "Indoor");

        let pairs: Vec<(&str, &FieldValue)> = state.iter().collect();
        assert_eq!(pairs[0], ("environment", &FieldValue::Text("Indoor".into())));
        assert_eq!(pairs[1], ("width", &FieldValue::Number(40.0)));
    }

    #[test]
    fn changed_from_reports_new_and_updated_names() {
        let mut before = SessionState::new();
        before.set("width", 40.0);
        before.set("environment", "Indoor");

        let mut after = before.clone();
        after.set("width", 45.0);
        after.set("height", 20.0);

        assert_eq!(after.changed_from(&before), vec!["height", "width"]);
    }

    #[test]
    fn changed_from_is_empty_when_identical() {
        let mut state = SessionState::new();
        state.set("width", 40.0);
        assert!(state.changed_from(&state.clone()).is_empty());
    }

    #[test]
    fn state_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionState>();
        assert_send_sync::<Payload>();
        assert_send_sync::<FieldValue>();
    }
}
