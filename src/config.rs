//! Pipeline limits and redaction configuration.
//!
//! Every tunable bound lives in [`PipelineConfig`] so deployments can adjust
//! limits as data rather than code changes. All members have defaults and
//! the whole struct loads from TOML.

use serde::{Deserialize, Serialize};

/// Size limits and the sensitive-field redaction list for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum candidate size in bytes, enforced before any parse attempt.
    pub max_payload_bytes: usize,
    /// Maximum number of entries allowed inside `fields`.
    pub max_fields: usize,
    /// Maximum `quoteId` length in characters.
    pub max_quote_id_chars: usize,
    /// Maximum length of a metadata string value in characters.
    pub max_metadata_value_chars: usize,
    /// Maximum length of any diagnostic excerpt quoted into errors or logs.
    pub excerpt_chars: usize,
    /// Field names whose values are replaced by a marker in logged output.
    pub redact_fields: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 16 * 1024,
            max_fields: 32,
            max_quote_id_chars: 64,
            max_metadata_value_chars: 256,
            excerpt_chars: 120,
            redact_fields: vec!["clientName".to_owned(), "contactName".to_owned()],
        }
    }
}

impl PipelineConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// Missing keys take their defaults, so a partial file tuning one limit
    /// is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the TOML is malformed or a limit is
    /// zero.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ConfigError(format!("invalid config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any limit is zero. A zero limit would
    /// reject every payload, which is always a deployment mistake.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_bytes == 0 {
            return Err(ConfigError("max_payload_bytes must be greater than 0".into()));
        }
        if self.max_fields == 0 {
            return Err(ConfigError("max_fields must be greater than 0".into()));
        }
        if self.max_quote_id_chars == 0 {
            return Err(ConfigError("max_quote_id_chars must be greater than 0".into()));
        }
        if self.max_metadata_value_chars == 0 {
            return Err(ConfigError(
                "max_metadata_value_chars must be greater than 0".into(),
            ));
        }
        if self.excerpt_chars == 0 {
            return Err(ConfigError("excerpt_chars must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Invalid configuration data: malformed file or an unusable limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);
