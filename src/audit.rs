//! Merge audit records with sensitive-field redaction.
//!
//! Every processed turn yields an [`AuditRecord`]: when it happened, whether
//! the payload passed, which fields changed, and a bounded diagnostic detail
//! with configured sensitive values replaced by [`REDACTED`]. Records are
//! emitted through `tracing` and serialize cleanly for callers that keep
//! their own trail.
//!
//! Redaction runs before bounding so a sensitive value can never straddle
//! the excerpt cut and leak a prefix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::ValidationError;
use crate::types::{FieldValue, SessionState};

/// Marker substituted for redacted values in logged output.
pub const REDACTED: &str = "[REDACTED]";

/// Outcome class recorded for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// No candidate block was found; state untouched.
    NoCandidate,
    /// Payload validated and merged.
    Accepted,
    /// Payload rejected; state untouched.
    Rejected,
}

/// One structured audit entry for a processed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the turn was processed.
    pub timestamp: DateTime<Utc>,
    /// Outcome class.
    pub status: AuditStatus,
    /// Names of fields whose value changed this turn, sorted. Field names
    /// come from the allow-list and are never sensitive; values are never
    /// recorded here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    /// Stable error code when `status` is `Rejected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Bounded, redacted human-readable detail.
    pub detail: String,
}

/// Builds and emits audit records with configured redaction.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    redact_fields: Vec<String>,
    excerpt_chars: usize,
}

impl AuditLogger {
    /// A logger using the config's redaction list and excerpt bound.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            redact_fields: config.redact_fields.clone(),
            excerpt_chars: config.excerpt_chars,
        }
    }

    /// Records an accepted merge from `previous` to `next`.
    #[must_use]
    pub fn record_merge(&self, previous: &SessionState, next: &SessionState) -> AuditRecord {
        let changed_fields = next.changed_from(previous);
        let detail = if changed_fields.is_empty() {
            "merged payload changed no fields".to_owned()
        } else {
            format!(
                "merged {} field(s): {}",
                changed_fields.len(),
                changed_fields.join(", ")
            )
        };
        AuditRecord {
            timestamp: Utc::now(),
            status: AuditStatus::Accepted,
            changed_fields,
            error_code: None,
            detail: excerpt(&detail, self.excerpt_chars),
        }
    }

    /// Records a validation rejection. The error detail may quote candidate
    /// text, so it is redacted against both the configured field names and
    /// any sensitive values already in `state`.
    #[must_use]
    pub fn record_rejection(&self, error: &ValidationError, state: &SessionState) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            status: AuditStatus::Rejected,
            changed_fields: Vec::new(),
            error_code: Some(error.code().to_owned()),
            detail: self.redact(&error.to_string(), state),
        }
    }

    /// Records a turn in which no payload block was found.
    #[must_use]
    pub fn record_no_candidate(&self) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            status: AuditStatus::NoCandidate,
            changed_fields: Vec::new(),
            error_code: None,
            detail: "no payload block in turn".to_owned(),
        }
    }

    /// Emits `record` through tracing with structured fields.
    pub fn log(&self, record: &AuditRecord) {
        match record.status {
            AuditStatus::Accepted => info!(
                status = "accepted",
                changed = record.changed_fields.len(),
                detail = %record.detail,
                "quote update merged"
            ),
            AuditStatus::Rejected => warn!(
                status = "rejected",
                code = record.error_code.as_deref().unwrap_or(""),
                detail = %record.detail,
                "quote update rejected"
            ),
            AuditStatus::NoCandidate => debug!(status = "no_candidate", "no payload block in turn"),
        }
    }

    /// Redacts configured field values out of `detail`, then bounds it.
    fn redact(&self, detail: &str, state: &SessionState) -> String {
        let mut out = detail.to_owned();
        for name in &self.redact_fields {
            out = redact_field_in_json(&out, name);
            if let Some(FieldValue::Text(value)) = state.get(name)
                && !value.is_empty()
            {
                out = out.replace(value.as_str(), REDACTED);
            }
        }
        excerpt(&out, self.excerpt_chars)
    }
}

/// Bounds `text` to at most `max_chars` characters for safe logging.
/// Longer input is cut and suffixed with an ellipsis.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

/// Replaces the quoted value of a `"<field>": "…"` pair with [`REDACTED`].
///
/// Works on JSON-ish text such as candidate excerpts inside error details.
/// The closing-quote scan skips `\"` escapes, so a value containing quotes
/// is consumed whole. Only the first occurrence is rewritten; excerpts are
/// short enough that repeats do not arise in practice.
#[must_use]
pub fn redact_field_in_json(text: &str, field: &str) -> String {
    let needle = format!("\"{field}\"");
    let Some(pos) = text.find(&needle) else {
        return text.to_owned();
    };
    let after = &text[pos + needle.len()..];
    let Some(colon) = after.find(':') else {
        return text.to_owned();
    };
    // Only a quote directly after the colon (whitespace aside) opens the
    // value. A non-string value has no quoted text to redact, and the next
    // pair's key must not be mistaken for it.
    let value = after[colon + 1..].trim_start();
    if !value.starts_with('"') {
        return text.to_owned();
    }
    let after_open = &value[1..];
    match closing_quote(after_open) {
        Some(close) => format!(
            "{}{needle}: \"{REDACTED}\"{}",
            &text[..pos],
            &after_open[close + 1..]
        ),
        // The value's closing quote was cut off (excerpt truncation). Drop
        // the tail rather than leak a value prefix.
        None => format!("{}{needle}: \"{REDACTED}\"", &text[..pos]),
    }
}

/// Byte offset of the first unescaped `"`. Quote and backslash are ASCII,
/// so the offset is always a character boundary.
fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (offset, byte) in text.as_bytes().iter().copied().enumerate() {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            return Some(offset);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> AuditLogger {
        AuditLogger::new(&PipelineConfig::default())
    }

    // ── record shapes ────────────────────────────────────────────────────

    #[test]
    fn merge_record_lists_changed_fields() {
        let mut previous = SessionState::new();
        previous.set("width", 40.0);
        let mut next = previous.clone();
        next.set("height", 20.0);
        next.set("width", 45.0);

        let record = logger().record_merge(&previous, &next);
        assert_eq!(record.status, AuditStatus::Accepted);
        assert_eq!(record.changed_fields, vec!["height", "width"]);
        assert!(record.error_code.is_none());
        assert!(record.detail.contains("2 field(s)"));
    }

    #[test]
    fn merge_record_with_no_changes() {
        let state = SessionState::new();
        let record = logger().record_merge(&state, &state.clone());
        assert!(record.changed_fields.is_empty());
        assert!(record.detail.contains("no fields"));
    }

    #[test]
    fn rejection_record_carries_code() {
        let error = ValidationError::UnknownField { name: "bogus".into() };
        let record = logger().record_rejection(&error, &SessionState::new());
        assert_eq!(record.status, AuditStatus::Rejected);
        assert_eq!(record.error_code.as_deref(), Some("UNKNOWN_FIELD"));
        assert!(record.changed_fields.is_empty());
        assert!(record.detail.contains("bogus"));
    }

    #[test]
    fn no_candidate_record() {
        let record = logger().record_no_candidate();
        assert_eq!(record.status, AuditStatus::NoCandidate);
        assert!(record.error_code.is_none());
    }

    #[test]
    fn record_serializes_with_snake_case_status() {
        let record = logger().record_no_candidate();
        let json = match serde_json::to_string(&record) {
            Ok(j) => j,
            Err(e) => unreachable!("serialize failed: {e}"),
        };
        assert!(json.contains("\"status\":\"no_candidate\""));
        assert!(json.contains("\"timestamp\""));
    }

    // ── redaction ────────────────────────────────────────────────────────

    #[test]
    fn rejection_detail_redacts_configured_json_pairs() {
        let error = ValidationError::ParseError {
            detail: "trailing comma in {\"clientName\": \"Acme Corp\", }".into(),
        };
        let record = logger().record_rejection(&error, &SessionState::new());
        assert!(!record.detail.contains("Acme Corp"));
        assert!(record.detail.contains(REDACTED));
        assert!(record.detail.contains("clientName"));
    }

    #[test]
    fn rejection_detail_redacts_values_known_from_state() {
        let mut state = SessionState::new();
        state.set("contactName", "Maria Flores");
        let error = ValidationError::ShapeError {
            detail: "quoteId must be a string, near Maria Flores".into(),
        };
        let record = logger().record_rejection(&error, &state);
        assert!(!record.detail.contains("Maria Flores"));
        assert!(record.detail.contains(REDACTED));
    }

    #[test]
    fn redaction_happens_before_bounding() {
        let long_tail = "x".repeat(300);
        let error = ValidationError::ParseError {
            detail: format!("bad {{\"clientName\": \"Secret Co\"}} {long_tail}"),
        };
        let record = logger().record_rejection(&error, &SessionState::new());
        assert!(record.detail.chars().count() <= 121);
        assert!(!record.detail.contains("Secret Co"));
    }

    #[test]
    fn redact_field_in_json_rewrites_value_only() {
        let out = redact_field_in_json(
            "{\"width\": 40, \"clientName\": \"Acme Corp\", \"height\": 20}",
            "clientName",
        );
        assert_eq!(
            out,
            format!("{{\"width\": 40, \"clientName\": \"{REDACTED}\", \"height\": 20}}")
        );
    }

    #[test]
    fn redact_field_in_json_leaves_other_text_alone() {
        let text = "{\"width\": 40}";
        assert_eq!(redact_field_in_json(text, "clientName"), text);
    }

    #[test]
    fn redact_field_in_json_truncated_value_drops_tail() {
        let out = redact_field_in_json("{\"clientName\": \"Hidden Val", "clientName");
        assert!(!out.contains("Hidden"));
        assert!(out.contains(REDACTED));
    }

    #[test]
    fn redact_field_in_json_covers_escaped_quotes_in_value() {
        // An escaped quote inside the value must not end the redaction
        // early and leave the rest of the name behind.
        let out = redact_field_in_json(
            "{\"clientName\": \"O\\\"Brien Media Group\", \"width\": 40}",
            "clientName",
        );
        assert!(!out.contains("Brien"));
        assert_eq!(out, format!("{{\"clientName\": \"{REDACTED}\", \"width\": 40}}"));
    }

    #[test]
    fn redact_field_in_json_ignores_non_string_value() {
        let text = "{\"clientName\": 42}";
        assert_eq!(redact_field_in_json(text, "clientName"), text);
    }

    #[test]
    fn redact_field_in_json_skips_non_string_value_before_next_pair() {
        // The next pair's opening quote is not the value of this one; the
        // text must come back untouched rather than spliced.
        let text = "{\"clientName\": 42, \"note\": \"x\"}";
        assert_eq!(redact_field_in_json(text, "clientName"), text);
    }

    // ── excerpt bounding ─────────────────────────────────────────────────

    #[test]
    fn excerpt_passes_short_text_through() {
        assert_eq!(excerpt("short", 10), "short");
    }

    #[test]
    fn excerpt_cuts_long_text_with_ellipsis() {
        let out = excerpt(&"a".repeat(50), 10);
        assert_eq!(out.chars().count(), 11);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let out = excerpt("żżżż", 2);
        assert_eq!(out, "żż…");
    }
}
