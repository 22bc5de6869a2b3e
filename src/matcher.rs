//! Field conditions and their conjunction.
//!
//! Pattern conditions are compiled once when the rule is built and are
//! anchored at the start of the field text only.

use crate::config::{RuleDescriptor, RuleValue};
use crate::error::ConfigError;
use crate::models::FieldValue;
use crate::record::Record;
use regex::Regex;

/// Key prefix of an exact-match condition
pub const MATCH_PREFIX: &str = "match_";
/// Key prefix of a regular-expression condition
pub const PATTERN_PREFIX: &str = "pattern_";

/// Capture groups of the last capturing pattern that matched.
///
/// Positions whose group did not participate in the match are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Groups(Vec<Option<String>>);

impl Groups {
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self(groups)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|g| g.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<String>] {
        &self.0
    }
}

/// A compiled, start-anchored regular expression
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(key: &str, source: &str) -> Result<Self, ConfigError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::Regex {
                key: key.to_string(),
                pattern: source.to_string(),
                source: e,
            })
        };
        // validate the bare source; the anchor group can hide an unbalanced `)`
        compile(source)?;
        let regex = compile(&format!(r"\A(?:{})", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn evaluate(&self, text: &str) -> Verdict {
        match self.regex.captures(text) {
            None => Verdict::Fail,
            Some(captures) if captures.len() > 1 => Verdict::Captured(Groups(
                captures
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect(),
            )),
            Some(_) => Verdict::Pass,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConditionKind {
    /// Field text must equal the value's text
    Exact(FieldValue),
    /// Pattern must match at the start of the field text
    Pattern(Pattern),
}

enum Verdict {
    Fail,
    Pass,
    Captured(Groups),
}

/// One test against one named record field
#[derive(Debug, Clone)]
pub struct Condition {
    field: String,
    kind: ConditionKind,
}

impl Condition {
    pub fn exact(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            kind: ConditionKind::Exact(value.into()),
        }
    }

    pub fn pattern(field: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        let field = field.into();
        let key = format!("{}{}", PATTERN_PREFIX, field);
        Ok(Self {
            kind: ConditionKind::Pattern(Pattern::new(&key, pattern)?),
            field,
        })
    }

    /// Build a condition from a `match_<field>` / `pattern_<field>` key.
    ///
    /// Returns `Ok(None)` when the key carries neither prefix.
    pub fn from_entry(
        context: &str,
        key: &str,
        value: &RuleValue,
    ) -> Result<Option<Self>, ConfigError> {
        let (field, is_pattern) = if let Some(field) = key.strip_prefix(MATCH_PREFIX) {
            (field, false)
        } else if let Some(field) = key.strip_prefix(PATTERN_PREFIX) {
            (field, true)
        } else {
            return Ok(None);
        };

        if field.is_empty() {
            return Err(ConfigError::InvalidKey {
                context: context.to_string(),
                key: key.to_string(),
                reason: "condition has no field name".to_string(),
            });
        }

        if !is_pattern {
            return Ok(Some(Self::exact(field, value.to_field_value())));
        }

        match value {
            RuleValue::Regex(source) | RuleValue::Scalar(FieldValue::Text(source)) => {
                Ok(Some(Self::pattern(field, source)?))
            }
            RuleValue::Scalar(other) => Err(ConfigError::InvalidValue {
                context: context.to_string(),
                key: key.to_string(),
                reason: format!("pattern must be a string, found '{}'", other),
            }),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    fn evaluate(&self, value: &FieldValue) -> Verdict {
        let text = value.to_text();
        match &self.kind {
            ConditionKind::Exact(expected) if expected.to_text() == text => Verdict::Pass,
            ConditionKind::Exact(_) => Verdict::Fail,
            ConditionKind::Pattern(pattern) => pattern.evaluate(&text),
        }
    }
}

/// A conjunction of conditions, evaluated in declaration order
#[derive(Debug, Clone, Default)]
pub struct Match {
    conditions: Vec<Condition>,
}

impl Match {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Build a match that accepts only condition keys
    pub fn from_descriptor(context: &str, descriptor: &RuleDescriptor) -> Result<Self, ConfigError> {
        let mut conditions = Vec::new();
        for (key, value) in descriptor.entries() {
            match Condition::from_entry(context, key, value)? {
                Some(condition) => conditions.push(condition),
                None => {
                    return Err(ConfigError::InvalidKey {
                        context: context.to_string(),
                        key: key.clone(),
                        reason: format!(
                            "only {}<field> and {}<field> conditions are allowed here",
                            MATCH_PREFIX, PATTERN_PREFIX
                        ),
                    })
                }
            }
        }
        Ok(Self::new(conditions))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate every condition against the record.
    ///
    /// Returns `None` on the first failing condition. A missing or falsy
    /// field fails the whole match. On success the groups of the last
    /// capturing pattern are returned (empty when nothing captured).
    pub fn check(&self, record: &dyn Record) -> Option<Groups> {
        let mut groups = Groups::default();
        for condition in &self.conditions {
            let value = record.get(condition.field())?;
            if !value.is_truthy() {
                return None;
            }
            match condition.evaluate(&value) {
                Verdict::Fail => return None,
                Verdict::Pass => {}
                Verdict::Captured(captured) => groups = captured,
            }
        }
        Some(groups)
    }
}
