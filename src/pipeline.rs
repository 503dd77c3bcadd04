//! The turn pipeline: extract, validate, merge, sanitize, audit.
//!
//! [`QuotePipeline`] wires the stages together behind one call,
//! [`process_turn`](QuotePipeline::process_turn). Raw text goes in; a
//! [`TurnReport`] comes out with the successor state, the display text, the
//! completion flag, and the audit record. Failures never panic and never
//! touch the caller's state.

use tracing::debug;

use crate::audit::{AuditLogger, AuditRecord};
use crate::completeness;
use crate::config::{ConfigError, PipelineConfig};
use crate::error::ValidationError;
use crate::extract::extract_candidate;
use crate::merge::merge_payload;
use crate::sanitize::sanitize_text;
use crate::schema::SchemaRegistry;
use crate::types::{Payload, SessionState};
use crate::validate::validate_candidate;

/// Tagged outcome of one processed turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// No payload block was found in the text. The common case for prose
    /// turns, not an error.
    NoCandidate,
    /// A candidate was found but failed validation; nothing merged.
    Rejected(ValidationError),
    /// The payload validated and its fields merged into the state.
    Merged {
        /// The validated payload, including any quote id and metadata.
        payload: Payload,
        /// Names of fields whose stored value changed this turn, sorted.
        changed_fields: Vec<String>,
    },
}

impl TurnOutcome {
    /// Whether fields were merged this turn.
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    /// The rejection, if validation failed.
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// Everything one processed turn produces.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Successor session state. Identical to the input unless the turn
    /// merged.
    pub state: SessionState,
    /// What happened, for the caller to branch on.
    pub outcome: TurnOutcome,
    /// Raw text with the payload block removed, safe to display.
    pub display_text: String,
    /// Whether the successor state satisfies the completion field list of
    /// the latest registered schema version.
    pub complete: bool,
    /// The audit record emitted for this turn.
    pub audit: AuditRecord,
}

/// The extraction, validation, and merge pipeline.
///
/// Holds only configuration, so one pipeline serves any number of sessions.
/// Turns within a single session must be processed in arrival order (merge
/// is last-write-wins per turn); independent sessions may run in parallel.
#[derive(Debug, Clone)]
pub struct QuotePipeline {
    config: PipelineConfig,
    registry: SchemaRegistry,
    audit: AuditLogger,
}

impl QuotePipeline {
    /// Builds a pipeline over `registry` with the given limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a limit is zero, the registry is
    /// internally inconsistent, or the registry has no versions at all.
    pub fn new(registry: SchemaRegistry, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        registry.validate()?;
        if registry.latest().is_none() {
            return Err(ConfigError(
                "registry must contain at least one schema version".into(),
            ));
        }
        let audit = AuditLogger::new(&config);
        Ok(Self {
            config,
            registry,
            audit,
        })
    }

    /// Pipeline over the built-in quote registry and default limits.
    #[must_use]
    pub fn builtin() -> Self {
        let config = PipelineConfig::default();
        let audit = AuditLogger::new(&config);
        Self {
            config,
            registry: SchemaRegistry::builtin(),
            audit,
        }
    }

    /// The registry this pipeline validates against.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The limits this pipeline enforces.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes one assistant turn against `state`.
    ///
    /// Runs extraction, validation, merge, sanitization, and audit in
    /// order. Total over arbitrary input: malformed, hostile, or oversized
    /// text becomes a tagged outcome, never a panic, and `state` is left
    /// untouched unless every validation step passed.
    #[must_use]
    pub fn process_turn(&self, state: &SessionState, raw_text: &str) -> TurnReport {
        let extraction = extract_candidate(raw_text);
        let display_text = sanitize_text(raw_text, extraction.as_ref());

        let Some(extraction) = extraction else {
            debug!("turn carried no payload block");
            let audit = self.audit.record_no_candidate();
            self.audit.log(&audit);
            return TurnReport {
                state: state.clone(),
                outcome: TurnOutcome::NoCandidate,
                display_text,
                complete: self.is_complete(state),
                audit,
            };
        };

        let validated = validate_candidate(&extraction.candidate, &self.registry, &self.config)
            .and_then(|payload| match self.registry.get(payload.schema_version) {
                Some(schema) => Ok((payload, schema)),
                None => Err(ValidationError::VersionError {
                    detail: format!("schemaVersion {} is not supported", payload.schema_version),
                }),
            });

        match validated {
            Ok((payload, schema)) => {
                let next = merge_payload(state, &payload, schema);
                let audit = self.audit.record_merge(state, &next);
                self.audit.log(&audit);
                let complete = self.is_complete(&next);
                TurnReport {
                    outcome: TurnOutcome::Merged {
                        changed_fields: audit.changed_fields.clone(),
                        payload,
                    },
                    state: next,
                    display_text,
                    complete,
                    audit,
                }
            }
            Err(error) => {
                let audit = self.audit.record_rejection(&error, state);
                self.audit.log(&audit);
                TurnReport {
                    state: state.clone(),
                    outcome: TurnOutcome::Rejected(error),
                    display_text,
                    complete: self.is_complete(state),
                    audit,
                }
            }
        }
    }

    /// Whether `state` satisfies the completion list of the latest
    /// registered schema version.
    #[must_use]
    pub fn is_complete(&self, state: &SessionState) -> bool {
        self.registry
            .latest()
            .is_some_and(|schema| completeness::is_complete(state, schema))
    }
}
