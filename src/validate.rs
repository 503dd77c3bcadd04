//! Schema validation of candidate payloads.
//!
//! All-or-nothing: a candidate either passes every check and becomes a fully
//! typed [`Payload`], or the first failing check rejects it wholesale. No
//! repair, no coercion, no partial acceptance.
//!
//! Checks run in a fixed order so rejections are deterministic:
//!
//! 1. byte-size gate, strictly before any parse attempt
//! 2. strict JSON parse
//! 3. top-level shape and envelope key allow-list
//! 4. `type` discriminator and `schemaVersion` gate
//! 5. field key allow-list for the declared version
//! 6. per-field constraint checks (null passes as a no-change marker)
//! 7. metadata key allow-list and scalar checks
//! 8. field count bound
//! 9. `quoteId` shape and length

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::audit::{excerpt, redact_field_in_json};
use crate::config::PipelineConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::SchemaRegistry;
use crate::types::{FieldValue, Payload};

/// Keys a payload may carry at the top level. Anything else rejects the
/// whole payload, exactly like an unknown field key.
const ENVELOPE_KEYS: [&str; 5] = ["type", "schemaVersion", "quoteId", "fields", "metadata"];

/// Validates one extracted candidate against the registry.
///
/// On success the returned [`Payload`] is fully typed and every field has
/// passed its constraint check. Rejections are logged at `warn` with a
/// bounded, redacted excerpt; the full candidate is never logged.
///
/// # Errors
///
/// Returns the first failing check as a [`ValidationError`]. See the module
/// docs for the check order.
pub fn validate_candidate(
    candidate: &str,
    registry: &SchemaRegistry,
    config: &PipelineConfig,
) -> ValidationResult {
    match run_checks(candidate, registry, config) {
        Ok(payload) => Ok(payload),
        Err(error) => {
            warn!(
                code = error.code(),
                candidate = %log_excerpt(candidate, config),
                "payload rejected"
            );
            Err(error)
        }
    }
}

fn run_checks(
    candidate: &str,
    registry: &SchemaRegistry,
    config: &PipelineConfig,
) -> ValidationResult {
    // Size gate first. An oversized candidate is rejected on length alone;
    // its content never reaches the parser.
    if candidate.len() > config.max_payload_bytes {
        return Err(ValidationError::SizeExceeded {
            detail: format!(
                "payload is {} bytes, limit is {}",
                candidate.len(),
                config.max_payload_bytes
            ),
        });
    }

    // Excerpt stays plain text so downstream redaction can still match
    // `"field": "value"` pairs inside it.
    let value: Value = serde_json::from_str(candidate).map_err(|e| ValidationError::ParseError {
        detail: format!("{e} near: {}", excerpt(candidate, config.excerpt_chars)),
    })?;

    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return Err(ValidationError::ShapeError {
                detail: format!(
                    "top-level value must be an object, got {}",
                    json_type_name(&value)
                ),
            });
        }
    };

    for key in object.keys() {
        if !ENVELOPE_KEYS.contains(&key.as_str()) {
            return Err(ValidationError::UnknownField { name: key.clone() });
        }
    }

    if object.get("type").and_then(Value::as_str) != Some(registry.payload_type.as_str()) {
        return Err(ValidationError::VersionError {
            detail: format!("payload type must be {:?}", registry.payload_type),
        });
    }

    let declared = object
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok());
    let schema = match declared.and_then(|v| registry.get(v)) {
        Some(schema) => schema,
        None => {
            return Err(ValidationError::VersionError {
                detail: format!(
                    "schemaVersion must be an integer in {:?}",
                    registry.supported_versions().collect::<Vec<_>>()
                ),
            });
        }
    };

    let mut fields = BTreeMap::new();
    if let Some(raw_fields) = object.get("fields") {
        let map = match raw_fields.as_object() {
            Some(map) => map,
            None => {
                return Err(ValidationError::ShapeError {
                    detail: format!("fields must be an object, got {}", json_type_name(raw_fields)),
                });
            }
        };

        // Allow-list pass runs to completion before any constraint check so
        // an unknown key always wins over a constraint violation.
        for name in map.keys() {
            if !schema.allows(name) {
                return Err(ValidationError::UnknownField { name: name.clone() });
            }
        }

        for (name, raw) in map {
            let Some(spec) = schema.field(name) else {
                return Err(ValidationError::UnknownField { name: name.clone() });
            };
            let Some(field_value) = scalar_value(raw) else {
                return Err(ValidationError::FieldConstraint {
                    field: name.clone(),
                    rule: "must be a number, string, boolean, or null".to_owned(),
                });
            };
            // Null means "no change"; it is carried through for the merger
            // to skip, not checked against the field's constraints.
            if !field_value.is_null()
                && let Err(rule) = spec.check(&field_value)
            {
                return Err(ValidationError::FieldConstraint {
                    field: name.clone(),
                    rule,
                });
            }
            fields.insert(name.clone(), field_value);
        }
    }

    let mut metadata = BTreeMap::new();
    if let Some(raw_metadata) = object.get("metadata") {
        let map = match raw_metadata.as_object() {
            Some(map) => map,
            None => {
                return Err(ValidationError::ShapeError {
                    detail: format!(
                        "metadata must be an object, got {}",
                        json_type_name(raw_metadata)
                    ),
                });
            }
        };
        for (key, raw) in map {
            if !registry.allows_metadata_key(key) {
                return Err(ValidationError::UnknownField {
                    name: format!("metadata.{key}"),
                });
            }
            let Some(value) = scalar_value(raw) else {
                return Err(ValidationError::FieldConstraint {
                    field: format!("metadata.{key}"),
                    rule: "must be a scalar value".to_owned(),
                });
            };
            if let FieldValue::Text(text) = &value
                && text.chars().count() > config.max_metadata_value_chars
            {
                return Err(ValidationError::FieldConstraint {
                    field: format!("metadata.{key}"),
                    rule: format!(
                        "must be at most {} characters",
                        config.max_metadata_value_chars
                    ),
                });
            }
            metadata.insert(key.clone(), value);
        }
    }

    if fields.len() > config.max_fields {
        return Err(ValidationError::SizeExceeded {
            detail: format!(
                "fields has {} entries, limit is {}",
                fields.len(),
                config.max_fields
            ),
        });
    }

    let quote_id = match object.get("quoteId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => {
            if id.chars().count() > config.max_quote_id_chars {
                return Err(ValidationError::ShapeError {
                    detail: format!(
                        "quoteId must be at most {} characters",
                        config.max_quote_id_chars
                    ),
                });
            }
            Some(id.clone())
        }
        Some(other) => {
            return Err(ValidationError::ShapeError {
                detail: format!("quoteId must be a string, got {}", json_type_name(other)),
            });
        }
    };

    Ok(Payload {
        payload_type: registry.payload_type.clone(),
        schema_version: schema.version,
        quote_id,
        fields,
        metadata,
    })
}

/// Maps a JSON scalar to a [`FieldValue`]. Arrays and objects yield `None`.
fn scalar_value(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Null => Some(FieldValue::Null),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Bounded candidate excerpt with configured sensitive fields redacted,
/// for the rejection log line.
fn log_excerpt(candidate: &str, config: &PipelineConfig) -> String {
    let mut out = candidate.to_owned();
    for field in &config.redact_fields {
        out = redact_field_in_json(&out, field);
    }
    excerpt(&out, config.excerpt_chars)
}
