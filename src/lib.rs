//! Quotegate: fail-closed structured-output gate for LLM quote assistants.
//!
//! Turns untrusted assistant text into schema-conformant updates to a
//! persistent quote session. A model is prompted to embed a JSON payload in
//! its replies; this crate finds that payload, validates it against a
//! versioned field registry, and only then merges it into session state.
//!
//! # Architecture
//!
//! One turn flows through five stages behind
//! [`QuotePipeline::process_turn`]:
//! - **Extract**: locate the candidate block (fenced code, HTML `pre`/`code`,
//!   or a bare balanced object)
//! - **Validate**: size gate, strict parse, shape, version, field allow-list,
//!   constraints; all-or-nothing
//! - **Merge**: last-write-wins per turn, null means "no change"
//! - **Sanitize**: cut the payload block out of the display text
//! - **Audit**: structured record with sensitive values redacted
//!
//! # Design
//!
//! - Fail closed: any ambiguity or violation discards the whole payload and
//!   leaves session state untouched. A skipped update costs one turn; a
//!   corrupted quote costs the session.
//! - Schemas are data: field rules live in a [`SchemaRegistry`] that loads
//!   from JSON, and versions are additive only.
//! - Completeness is derived, never stored: every read re-checks required
//!   fields against their constraints.
//!
//! # Example
//!
//! ```
//! use quotegate::{QuotePipeline, SessionState};
//!
//! let pipeline = QuotePipeline::builtin();
//! let state = SessionState::new();
//!
//! let reply = "Here is the update:\n```json\n{\"type\": \"anc_quote_update\", \
//!              \"schemaVersion\": 1, \"fields\": {\"width\": 40}}\n```";
//! let report = pipeline.process_turn(&state, reply);
//!
//! assert!(report.outcome.is_merged());
//! assert_eq!(report.display_text, "Here is the update:");
//! ```

pub mod audit;
pub mod completeness;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod sanitize;
pub mod schema;
pub mod types;
pub mod validate;

pub use audit::{AuditLogger, AuditRecord, AuditStatus, REDACTED};
pub use completeness::{is_complete, missing_fields};
pub use config::{ConfigError, PipelineConfig};
pub use error::{ValidationError, ValidationResult, error_codes};
pub use extract::{Extraction, ExtractionStrategy, extract_candidate};
pub use merge::merge_payload;
pub use pipeline::{QuotePipeline, TurnOutcome, TurnReport};
pub use sanitize::sanitize_text;
pub use schema::{DuplicateVersion, FieldKind, FieldSpec, SchemaRegistry, VersionSchema};
pub use types::{FieldValue, Payload, SessionState};
pub use validate::validate_candidate;
