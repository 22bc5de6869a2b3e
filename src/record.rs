//! Parsed records.
//!
//! [`Record`] is the contract every dialect's record type fulfils. [`Line`]
//! is the generic implementation used by the built-in dialect classes: a
//! fixed, schema-declared set of known fields stored positionally, plus a
//! side table for fields that rules (or surplus input keys) attach later.

use crate::classifier::Classificator;
use crate::config::DialectConfig;
use crate::error::{ConfigError, ParseError};
use crate::matcher::Match;
use crate::models::{FieldValue, Row};
use crate::rule::Outcome;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One parsed log line in a specific dialect's shape
pub trait Record: Send {
    /// Current value of a known or rule-attached field
    fn get(&self, field: &str) -> Option<FieldValue>;

    /// Overwrite a known field or attach a new one
    fn set(&mut self, field: &str, value: FieldValue);

    /// All dialect-required fields are present and truthy
    fn is_type(&self) -> bool;

    /// Dialect-specific eligibility for processing
    fn is_production(&self) -> bool {
        true
    }

    /// Ordered output columns
    fn get_row(&self) -> Row;

    /// Classificator of the dialect that produced this record
    fn classificator(&self) -> &Arc<Classificator>;
}

impl dyn Record + '_ {
    /// Run the owning classificator against this record
    pub fn classify(&mut self) -> Outcome {
        let classificator = Arc::clone(self.classificator());
        classificator.classify(self)
    }
}

impl fmt::Debug for dyn Record + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Record").field(&self.get_row()).finish()
    }
}

#[derive(Debug, Clone)]
struct TimestampRule {
    index: usize,
    field: String,
    format: String,
}

impl TimestampRule {
    fn accepts(&self, text: &str) -> bool {
        NaiveDateTime::parse_from_str(text, &self.format).is_ok()
            || DateTime::parse_from_str(text, &self.format).is_ok()
            || NaiveDate::parse_from_str(text, &self.format).is_ok()
    }
}

/// Field layout shared by every [`Line`] of one dialect
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<String>,
    required: Vec<usize>,
    row: Vec<String>,
    production: Option<Match>,
    timestamp: Option<TimestampRule>,
}

impl Schema {
    /// Every field is required and the row repeats the fields in order
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            required: (0..fields.len()).collect(),
            row: fields.clone(),
            fields,
            production: None,
            timestamp: None,
        }
    }

    pub fn with_required(mut self, required: &[String]) -> Result<Self, ConfigError> {
        self.required = required
            .iter()
            .map(|name| {
                self.position(name).ok_or_else(|| ConfigError::Invalid {
                    parameter: "required".to_string(),
                    reason: format!("'{}' is not a known field", name),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Output columns; may name fields that only rules attach
    pub fn with_row(mut self, row: Vec<String>) -> Self {
        self.row = row;
        self
    }

    pub fn with_production(mut self, production: Match) -> Self {
        self.production = Some(production);
        self
    }

    pub fn with_timestamp(mut self, field: &str, format: &str) -> Result<Self, ConfigError> {
        let index = self.position(field).ok_or_else(|| ConfigError::Invalid {
            parameter: "timestamp.field".to_string(),
            reason: format!("'{}' is not a known field", field),
        })?;
        self.timestamp = Some(TimestampRule {
            index,
            field: field.to_string(),
            format: format.to_string(),
        });
        Ok(self)
    }

    /// Apply the shared dialect options on top of the given known fields
    pub fn from_config(config: &DialectConfig, fields: Vec<String>) -> Result<Self, ConfigError> {
        if fields.is_empty() {
            return Err(ConfigError::Invalid {
                parameter: format!("dialect '{}' fields", config.dialect),
                reason: "at least one field is required".to_string(),
            });
        }

        let mut schema = Schema::new(fields);
        if let Some(required) = &config.required {
            schema = schema.with_required(required)?;
        }
        if let Some(row) = &config.row {
            schema = schema.with_row(row.clone());
        }
        if let Some(timestamp) = &config.timestamp {
            schema = schema.with_timestamp(&timestamp.field, &timestamp.format)?;
        }
        if let Some(descriptor) = config.production_descriptor()? {
            let context = format!("dialect '{}' production", config.dialect);
            schema = schema.with_production(Match::from_descriptor(&context, &descriptor)?);
        }
        Ok(schema)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn row(&self) -> &[String] {
        &self.row
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// Generic record backed by a [`Schema`]
#[derive(Debug, Clone)]
pub struct Line {
    schema: Arc<Schema>,
    values: Vec<FieldValue>,
    extra: BTreeMap<String, FieldValue>,
    classificator: Arc<Classificator>,
}

impl Line {
    /// Build a line from values in schema order, enforcing the timestamp check
    pub fn new(
        schema: Arc<Schema>,
        classificator: Arc<Classificator>,
        mut values: Vec<FieldValue>,
    ) -> Result<Self, ParseError> {
        values.resize(schema.fields.len(), FieldValue::Null);

        if let Some(rule) = &schema.timestamp {
            let value = &values[rule.index];
            if value.is_truthy() && !rule.accepts(&value.to_text()) {
                return Err(ParseError::Timestamp {
                    field: rule.field.clone(),
                    input: value.to_text(),
                    format: rule.format.clone(),
                });
            }
        }

        Ok(Self {
            schema,
            values,
            extra: BTreeMap::new(),
            classificator,
        })
    }

    /// Attach fields the schema does not declare
    pub fn with_extra(mut self, extra: BTreeMap<String, FieldValue>) -> Self {
        self.extra = extra;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn extra(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra
    }
}

impl Record for Line {
    fn get(&self, field: &str) -> Option<FieldValue> {
        match self.schema.position(field) {
            Some(idx) => self.values.get(idx).cloned(),
            None => self.extra.get(field).cloned(),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) {
        match self.schema.position(field) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.extra.insert(field.to_string(), value);
            }
        }
    }

    fn is_type(&self) -> bool {
        self.schema
            .required
            .iter()
            .all(|&idx| self.values[idx].is_truthy())
    }

    fn is_production(&self) -> bool {
        match &self.schema.production {
            Some(production) => production.check(self).is_some(),
            None => true,
        }
    }

    fn get_row(&self) -> Row {
        self.schema
            .row
            .iter()
            .map(|column| self.get(column).unwrap_or_default())
            .collect()
    }

    fn classificator(&self) -> &Arc<Classificator> {
        &self.classificator
    }
}
