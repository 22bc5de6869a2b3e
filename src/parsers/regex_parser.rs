use crate::classifier::Classificator;
use crate::config::DialectConfig;
use crate::error::{ConfigError, ParseError};
use crate::models::FieldValue;
use crate::parsers::RecordFactory;
use crate::record::{Line, Record, Schema};
use regex::Regex;
use std::sync::Arc;

/// Pattern parser: named capture groups become the known fields.
///
/// The pattern is used as written, so anchor it with `^...$` when the whole
/// line has to match.
#[derive(Debug, Clone)]
pub struct RegexParser {
    pattern: Regex,
    schema: Arc<Schema>,
}

impl RegexParser {
    pub fn from_config(config: &DialectConfig) -> Result<Self, ConfigError> {
        let source = config.pattern.as_deref().ok_or_else(|| ConfigError::Invalid {
            parameter: format!("dialect '{}' pattern", config.dialect),
            reason: "the regex class requires a pattern".to_string(),
        })?;
        let pattern = Regex::new(source).map_err(|e| ConfigError::Regex {
            key: "pattern".to_string(),
            pattern: source.to_string(),
            source: e,
        })?;

        let fields: Vec<String> = pattern.capture_names().flatten().map(String::from).collect();
        let schema = Schema::from_config(config, fields)?;
        Ok(Self {
            pattern,
            schema: Arc::new(schema),
        })
    }
}

impl RecordFactory for RegexParser {
    fn parse(
        &self,
        classificator: Arc<Classificator>,
        line: &str,
    ) -> Result<Box<dyn Record>, ParseError> {
        let captures = self
            .pattern
            .captures(line)
            .ok_or_else(|| ParseError::PatternMismatch {
                pattern: self.pattern.as_str().to_string(),
            })?;

        let values = self
            .schema
            .fields()
            .iter()
            .map(|name| FieldValue::from(captures.name(name).map_or("", |m| m.as_str())))
            .collect();
        let line = Line::new(Arc::clone(&self.schema), classificator, values)?;
        Ok(Box::new(line))
    }

    fn kind(&self) -> &'static str {
        "regex"
    }
}
