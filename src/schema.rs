//! Versioned field allow-lists for quote update payloads.
//!
//! A [`SchemaRegistry`] maps schema versions to their field rules. Versions
//! are additive only: a new payload shape gets a new version number, and an
//! existing version's rules never change after registration. The whole
//! registry is serializable, so deployments can ship field rules as data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::types::FieldValue;

/// Type and constraint set for a single allow-listed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// JSON number with optional inclusive bounds.
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// JSON string with optional character-length bounds.
    #[serde(rename = "string")]
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
    /// JSON string restricted to a fixed option set.
    Enum { options: Vec<String> },
}

/// One allow-listed field: wire name, constraints, and whether it counts
/// toward quote completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Wire name, exactly as it appears as a key inside `fields`.
    pub name: String,
    /// Type and constraint set for the field's value.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the quote needs this field before it is complete.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// An unbounded numeric field.
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Number { min: None, max: None },
            required: false,
        }
    }

    /// An unbounded string field.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text { min_len: None, max_len: None },
            required: false,
        }
    }

    /// A string field restricted to the given options.
    pub fn one_of<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FieldKind::Enum {
                options: options.into_iter().map(Into::into).collect(),
            },
            required: false,
        }
    }

    /// Sets the inclusive lower bound. No effect on non-numeric kinds.
    #[must_use]
    pub fn with_min(mut self, min: f64) -> Self {
        if let FieldKind::Number { min: slot, .. } = &mut self.kind {
            *slot = Some(min);
        }
        self
    }

    /// Sets the inclusive upper bound. No effect on non-numeric kinds.
    #[must_use]
    pub fn with_max(mut self, max: f64) -> Self {
        if let FieldKind::Number { max: slot, .. } = &mut self.kind {
            *slot = Some(max);
        }
        self
    }

    /// Sets the minimum character length. No effect on non-string kinds.
    #[must_use]
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        if let FieldKind::Text { min_len: slot, .. } = &mut self.kind {
            *slot = Some(min_len);
        }
        self
    }

    /// Sets the maximum character length. No effect on non-string kinds.
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        if let FieldKind::Text { max_len: slot, .. } = &mut self.kind {
            *slot = Some(max_len);
        }
        self
    }

    /// Marks this field as counting toward quote completeness.
    #[must_use]
    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }

    /// Checks `value` against this field's type and constraints.
    ///
    /// # Errors
    ///
    /// Returns the broken rule in plain words, suitable for embedding in a
    /// [`FieldConstraint`](crate::error::ValidationError::FieldConstraint)
    /// rejection. `Null` never passes; callers treating null as "no change"
    /// skip the check instead.
    pub fn check(&self, value: &FieldValue) -> Result<(), String> {
        match (&self.kind, value) {
            (_, FieldValue::Null) => Err("must not be null".to_owned()),
            (FieldKind::Number { min, max }, FieldValue::Number(n)) => {
                if !n.is_finite() {
                    return Err("must be a finite number".to_owned());
                }
                if let Some(min) = min
                    && n < min
                {
                    return Err(format!("must be at least {min}"));
                }
                if let Some(max) = max
                    && n > max
                {
                    return Err(format!("must be at most {max}"));
                }
                Ok(())
            }
            (FieldKind::Number { .. }, _) => Err("must be a number".to_owned()),
            (FieldKind::Text { min_len, max_len }, FieldValue::Text(s)) => {
                let chars = s.chars().count();
                if let Some(min_len) = min_len
                    && chars < *min_len
                {
                    return Err(format!("must be at least {min_len} characters"));
                }
                if let Some(max_len) = max_len
                    && chars > *max_len
                {
                    return Err(format!("must be at most {max_len} characters"));
                }
                Ok(())
            }
            (FieldKind::Text { .. }, _) => Err("must be a string".to_owned()),
            (FieldKind::Enum { options }, FieldValue::Text(s)) => {
                if options.iter().any(|option| option == s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", options.join(", ")))
                }
            }
            (FieldKind::Enum { .. }, _) => Err("must be a string".to_owned()),
        }
    }
}

/// The complete field allow-list for one schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSchema {
    /// The version number payloads declare via `schemaVersion`.
    pub version: u32,
    /// Allow-listed fields, in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl VersionSchema {
    /// An empty schema for the given version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            fields: Vec::new(),
        }
    }

    /// Adds a field to the allow-list.
    #[must_use]
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Looks up an allow-listed field by wire name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Whether `name` is on the allow-list.
    pub fn allows(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Allow-listed wire names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|spec| spec.name.as_str())
    }

    /// Fields that count toward quote completeness.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.required)
    }
}

/// Registering a version number that already exists.
///
/// Versions are additive only; an existing version's rules never change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema version {0} is already registered")]
pub struct DuplicateVersion(pub u32);

/// Registry of supported schema versions plus the envelope-level rules
/// shared by all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    /// The single accepted `type` discriminator.
    pub payload_type: String,
    /// Keys accepted inside the optional `metadata` object.
    #[serde(default)]
    pub metadata_keys: Vec<String>,
    /// Supported versions keyed by version number. Private so additions go
    /// through [`register`](Self::register).
    versions: BTreeMap<u32, VersionSchema>,
}

impl SchemaRegistry {
    /// An empty registry accepting only the given payload type.
    pub fn new(payload_type: impl Into<String>) -> Self {
        Self {
            payload_type: payload_type.into(),
            metadata_keys: Vec::new(),
            versions: BTreeMap::new(),
        }
    }

    /// Sets the accepted metadata keys.
    #[must_use]
    pub fn with_metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// The built-in registry: LED display quote updates, version 1.
    pub fn builtin() -> Self {
        let v1 = VersionSchema::new(1)
            .with_field(FieldSpec::number("width").with_min(1.0).with_max(1000.0).require())
            .with_field(FieldSpec::number("height").with_min(1.0).with_max(500.0).require())
            .with_field(FieldSpec::one_of("environment", ["Indoor", "Outdoor"]).require())
            .with_field(FieldSpec::number("pixelPitch").with_min(0.5).with_max(40.0).require())
            .with_field(
                FieldSpec::number("finalPrice")
                    .with_min(0.0)
                    .with_max(50_000_000.0)
                    .require(),
            )
            .with_field(FieldSpec::text("clientName").with_max_len(120))
            .with_field(FieldSpec::text("contactName").with_max_len(120))
            .with_field(FieldSpec::one_of(
                "installType",
                ["Wall Mount", "Rooftop", "Ground Mount", "Mobile Trailer"],
            ));

        let mut versions = BTreeMap::new();
        versions.insert(v1.version, v1);
        Self {
            payload_type: "anc_quote_update".to_owned(),
            metadata_keys: vec![
                "confidence".to_owned(),
                "reasoning".to_owned(),
                "source".to_owned(),
            ],
            versions,
        }
    }

    /// Parses a registry from JSON text and checks its internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the JSON is malformed or the registry
    /// fails [`validate`](Self::validate).
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let registry: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError(format!("invalid registry JSON: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Checks internal consistency: non-empty payload type, version keys
    /// matching their schema, no duplicate field names, no empty option
    /// sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payload_type.is_empty() {
            return Err(ConfigError("payload_type must not be empty".into()));
        }
        for (version, schema) in &self.versions {
            if *version != schema.version {
                return Err(ConfigError(format!(
                    "version key {version} does not match schema version {}",
                    schema.version
                )));
            }
            let mut seen = BTreeSet::new();
            for spec in &schema.fields {
                if !seen.insert(spec.name.as_str()) {
                    return Err(ConfigError(format!(
                        "schema version {version} declares field {:?} twice",
                        spec.name
                    )));
                }
                if let FieldKind::Enum { options } = &spec.kind
                    && options.is_empty()
                {
                    return Err(ConfigError(format!(
                        "enum field {:?} in version {version} has no options",
                        spec.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Registers a new schema version.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateVersion`] when the version number already exists.
    /// Changing a shipped version is never allowed; add a new one instead.
    pub fn register(&mut self, schema: VersionSchema) -> Result<(), DuplicateVersion> {
        if self.versions.contains_key(&schema.version) {
            return Err(DuplicateVersion(schema.version));
        }
        self.versions.insert(schema.version, schema);
        Ok(())
    }

    /// The schema for `version`, if supported.
    pub fn get(&self, version: u32) -> Option<&VersionSchema> {
        self.versions.get(&version)
    }

    /// Whether `version` is supported.
    pub fn supports(&self, version: u32) -> bool {
        self.versions.contains_key(&version)
    }

    /// Supported version numbers, ascending.
    pub fn supported_versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.versions.keys().copied()
    }

    /// The highest registered version, if any.
    pub fn latest(&self) -> Option<&VersionSchema> {
        self.versions.values().next_back()
    }

    /// Whether `key` is accepted inside `metadata`.
    pub fn allows_metadata_key(&self, key: &str) -> bool {
        self.metadata_keys.iter().any(|k| k == key)
    }
}
