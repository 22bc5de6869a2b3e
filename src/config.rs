//! Dialect configuration files.
//!
//! Each YAML file describes one dialect: which record class parses it, the
//! class options, and the ordered classification rules. Rule mappings are
//! kept as [`RuleDescriptor`]s whose values distinguish plain scalars from
//! `!regexp`-tagged regular expressions.
//!
//! ```yaml
//! dialect: webapp
//! class: delimited
//! separator: ","
//! fields: [timestamp, service_name, user_id]
//! row: [timestamp, user_id, event]
//! classifications:
//!   - match_user_id: 43
//!     ignore: true
//!   - pattern_service_name: !regexp '(\w+)_production'
//!     event: 'ComeFrom.{0}'
//! ```

use crate::error::ConfigError;
use crate::models::FieldValue;
use glob::glob;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// YAML tag marking a scalar as a regular expression
pub const REGEXP_TAG: &str = "!regexp";

const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// A value in a rule mapping
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Scalar(FieldValue),
    Regex(String),
}

impl RuleValue {
    /// Convert a YAML node, rejecting anything that is not a scalar
    pub fn from_yaml(context: &str, key: &str, value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Tagged(tagged) => {
                if tagged.tag != REGEXP_TAG {
                    return Err(ConfigError::InvalidValue {
                        context: context.to_string(),
                        key: key.to_string(),
                        reason: format!("unsupported tag {}", tagged.tag),
                    });
                }
                match &tagged.value {
                    Value::String(pattern) => Ok(RuleValue::Regex(pattern.clone())),
                    _ => Err(ConfigError::InvalidValue {
                        context: context.to_string(),
                        key: key.to_string(),
                        reason: format!("{} must tag a string", REGEXP_TAG),
                    }),
                }
            }
            other => Ok(RuleValue::Scalar(scalar_from_yaml(context, key, other)?)),
        }
    }

    /// The value as a record field value; a regex counts as its source text
    pub fn to_field_value(&self) -> FieldValue {
        match self {
            RuleValue::Scalar(value) => value.clone(),
            RuleValue::Regex(pattern) => FieldValue::Text(pattern.clone()),
        }
    }
}

fn scalar_from_yaml(context: &str, key: &str, value: &Value) -> Result<FieldValue, ConfigError> {
    let invalid = |kind: &str| ConfigError::InvalidValue {
        context: context.to_string(),
        key: key.to_string(),
        reason: format!("expected a scalar, found a {}", kind),
    };

    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(invalid("number out of range"))
            }
        }
        Value::String(s) => Ok(FieldValue::Text(s.clone())),
        Value::Sequence(_) => Err(invalid("sequence")),
        Value::Mapping(_) => Err(invalid("mapping")),
        Value::Tagged(_) => Err(invalid("tagged value")),
    }
}

/// One rule mapping, with keys in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleDescriptor {
    entries: Vec<(String, RuleValue)>,
}

impl RuleDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used mostly by tests and plugins
    pub fn with(mut self, key: impl Into<String>, value: RuleValue) -> Self {
        self.entries.push((key.into(), value));
        self
    }

    pub fn from_yaml(context: &str, mapping: &Mapping) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s.clone(),
                other => {
                    return Err(ConfigError::InvalidKey {
                        context: context.to_string(),
                        key: format!("{:?}", other),
                        reason: "rule keys must be strings".to_string(),
                    })
                }
            };
            let value = RuleValue::from_yaml(context, &key, value)?;
            entries.push((key, value));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, RuleValue)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Optional timestamp validation for a dialect
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimestampConfig {
    pub field: String,
    /// chrono strftime format
    pub format: String,
}

/// Deserialized contents of one dialect file
#[derive(Debug, Clone, Deserialize)]
pub struct DialectConfig {
    /// Dialect name, used in logs and statistics
    pub dialect: String,
    /// Record class registered in the dialect registry
    pub class: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub required: Option<Vec<String>>,
    #[serde(default)]
    pub row: Option<Vec<String>>,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min_pairs: Option<usize>,
    #[serde(default)]
    pub timestamp: Option<TimestampConfig>,
    #[serde(default)]
    pub production: Option<Mapping>,
    #[serde(default)]
    pub classifications: Option<Vec<Mapping>>,
}

impl DialectConfig {
    /// Minimal config for a class; used when building dialects in code
    pub fn new(dialect: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            class: class.into(),
            fields: Vec::new(),
            required: None,
            row: None,
            separator: None,
            pattern: None,
            min_pairs: None,
            timestamp: None,
            production: None,
            classifications: None,
        }
    }

    pub fn from_yaml_str(source: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::Yaml {
            path: path.to_string(),
            source: e,
        })
    }

    /// Rule descriptors in declaration order; a null list means no rules
    pub fn rule_descriptors(&self) -> Result<Vec<RuleDescriptor>, ConfigError> {
        self.classifications
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(idx, mapping)| {
                let context = format!("dialect '{}' classifications[{}]", self.dialect, idx);
                RuleDescriptor::from_yaml(&context, mapping)
            })
            .collect()
    }

    pub fn production_descriptor(&self) -> Result<Option<RuleDescriptor>, ConfigError> {
        self.production
            .as_ref()
            .map(|mapping| {
                let context = format!("dialect '{}' production", self.dialect);
                RuleDescriptor::from_yaml(&context, mapping)
            })
            .transpose()
    }
}

/// Load one dialect file from disk
pub fn load_dialect_file(path: impl AsRef<Path>) -> Result<DialectConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let metadata = fs::metadata(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid {
            parameter: display,
            reason: format!(
                "file too large: {} bytes (max {})",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let source = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        source: e,
    })?;
    DialectConfig::from_yaml_str(&source, &display)
}

/// Expand glob patterns in config path arguments, keeping argument order
pub fn expand_config_paths(patterns: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if pattern_str.contains('*') || pattern_str.contains('?') || pattern_str.contains('[') {
            let entries = glob(&pattern_str).map_err(|e| ConfigError::Glob {
                pattern: pattern_str.to_string(),
                reason: e.to_string(),
            })?;
            let mut matched = Vec::new();
            for entry in entries {
                matched.push(entry.map_err(|e| ConfigError::Glob {
                    pattern: pattern_str.to_string(),
                    reason: e.to_string(),
                })?);
            }
            if matched.is_empty() {
                return Err(ConfigError::Glob {
                    pattern: pattern_str.to_string(),
                    reason: "no files matched".to_string(),
                });
            }
            files.extend(matched);
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}
