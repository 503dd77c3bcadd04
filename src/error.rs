//! Rejection taxonomy for payload validation.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via
//! [`ValidationError::code()`]. Codes are part of the public API contract
//! and will not change.
//!
//! Every rejection is terminal: the candidate payload is discarded wholesale
//! and nothing is merged. There is no partially-valid outcome.

use crate::types::Payload;

/// Stable error codes for programmatic rejection handling.
///
/// These codes never change and form part of the public API contract.
/// Match on these rather than parsing Display output.
pub mod error_codes {
    /// Candidate exceeded a configured size bound (bytes or field count).
    pub const SIZE_EXCEEDED: &str = "SIZE_EXCEEDED";

    /// Candidate was not syntactically valid JSON.
    pub const PARSE_ERROR: &str = "PARSE_ERROR";

    /// Candidate parsed but its structure is wrong (non-object top level,
    /// mistyped envelope member).
    pub const SHAPE_ERROR: &str = "SHAPE_ERROR";

    /// Wrong payload discriminator or unsupported schema version.
    pub const VERSION_ERROR: &str = "VERSION_ERROR";

    /// A key outside the allow-list was present.
    pub const UNKNOWN_FIELD: &str = "UNKNOWN_FIELD";

    /// An allow-listed field violated its declared constraints.
    pub const FIELD_CONSTRAINT: &str = "FIELD_CONSTRAINT";
}

/// A terminal validation rejection.
///
/// The Display impl formats as `[CODE] message`. Diagnostic details quote at
/// most a bounded excerpt of the candidate, never the full text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Byte length or field count exceeded a configured bound. The byte
    /// bound fires before any parse attempt.
    #[error("[{}] {detail}", error_codes::SIZE_EXCEEDED)]
    SizeExceeded {
        /// What was measured and which limit it broke.
        detail: String,
    },

    /// The candidate is not syntactically valid JSON.
    #[error("[{}] {detail}", error_codes::PARSE_ERROR)]
    ParseError {
        /// Parser diagnostic plus a bounded excerpt of the candidate.
        detail: String,
    },

    /// The candidate parsed but is structurally wrong: non-object top level,
    /// or an envelope member (`fields`, `metadata`, `quoteId`) of the wrong
    /// shape.
    #[error("[{}] {detail}", error_codes::SHAPE_ERROR)]
    ShapeError {
        /// Which structural expectation was violated.
        detail: String,
    },

    /// Wrong `type` discriminator, or a `schemaVersion` that is not an
    /// integer in the supported set. No forward or backward guessing.
    #[error("[{}] {detail}", error_codes::VERSION_ERROR)]
    VersionError {
        /// The discriminator or version expectation that failed.
        detail: String,
    },

    /// A key outside the allow-list appeared. The whole payload is rejected;
    /// none of its otherwise-valid fields survive.
    #[error("[{}] unknown field {name:?}", error_codes::UNKNOWN_FIELD)]
    UnknownField {
        /// The offending key, exactly as it appeared.
        name: String,
    },

    /// An allow-listed field failed its constraint check.
    #[error("[{}] field {field:?} {rule}", error_codes::FIELD_CONSTRAINT)]
    FieldConstraint {
        /// The field that failed.
        field: String,
        /// The rule it broke, in plain words.
        rule: String,
    },
}

impl ValidationError {
    /// Returns the stable error code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SizeExceeded { .. } => error_codes::SIZE_EXCEEDED,
            Self::ParseError { .. } => error_codes::PARSE_ERROR,
            Self::ShapeError { .. } => error_codes::SHAPE_ERROR,
            Self::VersionError { .. } => error_codes::VERSION_ERROR,
            Self::UnknownField { .. } => error_codes::UNKNOWN_FIELD,
            Self::FieldConstraint { .. } => error_codes::FIELD_CONSTRAINT,
        }
    }

    /// The field or key this rejection names, when one applies.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { name } => Some(name),
            Self::FieldConstraint { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// All-or-nothing outcome of validating one candidate payload: either a
/// fully typed [`Payload`] or a terminal rejection. There is no
/// partially-valid result.
pub type ValidationResult = Result<Payload, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ── codes ────────────────────────────────────────────────────────────

    #[test]
    fn size_exceeded_code() {
        let err = ValidationError::SizeExceeded {
            detail: "payload is 99 bytes, limit is 10".into(),
        };
        assert_eq!(err.code(), "SIZE_EXCEEDED");
    }

    #[test]
    fn parse_error_code() {
        let err = ValidationError::ParseError {
            detail: "expected value at line 1".into(),
        };
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[test]
    fn shape_error_code() {
        let err = ValidationError::ShapeError {
            detail: "top-level value must be an object".into(),
        };
        assert_eq!(err.code(), "SHAPE_ERROR");
    }

    #[test]
    fn version_error_code() {
        let err = ValidationError::VersionError {
            detail: "schemaVersion must be one of [1]".into(),
        };
        assert_eq!(err.code(), "VERSION_ERROR");
    }

    #[test]
    fn unknown_field_code_and_name() {
        let err = ValidationError::UnknownField {
            name: "discountRate".into(),
        };
        assert_eq!(err.code(), "UNKNOWN_FIELD");
        assert_eq!(err.field(), Some("discountRate"));
    }

    #[test]
    fn field_constraint_code_and_name() {
        let err = ValidationError::FieldConstraint {
            field: "environment".into(),
            rule: "must be one of: Indoor, Outdoor".into(),
        };
        assert_eq!(err.code(), "FIELD_CONSTRAINT");
        assert_eq!(err.field(), Some("environment"));
    }

    // ── display format ───────────────────────────────────────────────────

    #[test]
    fn display_includes_code_prefix() {
        let err = ValidationError::SizeExceeded {
            detail: "payload is 99 bytes, limit is 10".into(),
        };
        let display = format!("{err}");
        assert!(display.starts_with("[SIZE_EXCEEDED]"));
        assert!(display.contains("99 bytes"));
    }

    #[test]
    fn display_unknown_field_quotes_key() {
        let err = ValidationError::UnknownField {
            name: "bogus".into(),
        };
        let display = format!("{err}");
        assert!(display.starts_with("[UNKNOWN_FIELD]"));
        assert!(display.contains("\"bogus\""));
    }

    #[test]
    fn display_field_constraint_names_field_and_rule() {
        let err = ValidationError::FieldConstraint {
            field: "width".into(),
            rule: "must be at most 1000".into(),
        };
        let display = format!("{err}");
        assert!(display.contains("\"width\""));
        assert!(display.contains("must be at most 1000"));
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors = [
            ValidationError::SizeExceeded { detail: "x".into() },
            ValidationError::ParseError { detail: "x".into() },
            ValidationError::ShapeError { detail: "x".into() },
            ValidationError::VersionError { detail: "x".into() },
            ValidationError::UnknownField { name: "x".into() },
            ValidationError::FieldConstraint {
                field: "x".into(),
                rule: "y".into(),
            },
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code:?} is not SCREAMING_SNAKE_CASE"
            );
            let display = format!("{err}");
            assert!(
                display.starts_with(&format!("[{code}]")),
                "display {display:?} does not start with [{code}]"
            );
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    #[test]
    fn field_is_none_for_structural_errors() {
        let err = ValidationError::ShapeError {
            detail: "fields must be an object".into(),
        };
        assert!(err.field().is_none());
    }

    #[test]
    fn errors_are_comparable() {
        let a = ValidationError::UnknownField { name: "a".into() };
        let b = ValidationError::UnknownField { name: "a".into() };
        let c = ValidationError::UnknownField { name: "c".into() };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidationError>();
    }
}
