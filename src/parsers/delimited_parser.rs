use crate::classifier::Classificator;
use crate::config::DialectConfig;
use crate::error::{ConfigError, ParseError};
use crate::models::FieldValue;
use crate::parsers::RecordFactory;
use crate::record::{Line, Record, Schema};
use std::sync::Arc;

pub const DEFAULT_SEPARATOR: &str = ",";

/// Splits a line on a fixed separator into exactly one part per known field
#[derive(Debug, Clone)]
pub struct DelimitedParser {
    separator: String,
    schema: Arc<Schema>,
}

impl DelimitedParser {
    pub fn new(separator: impl Into<String>, schema: Schema) -> Self {
        Self {
            separator: separator.into(),
            schema: Arc::new(schema),
        }
    }

    pub fn from_config(config: &DialectConfig) -> Result<Self, ConfigError> {
        let separator = config
            .separator
            .clone()
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        if separator.is_empty() {
            return Err(ConfigError::Invalid {
                parameter: format!("dialect '{}' separator", config.dialect),
                reason: "separator must not be empty".to_string(),
            });
        }
        let schema = Schema::from_config(config, config.fields.clone())?;
        Ok(Self::new(separator, schema))
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl RecordFactory for DelimitedParser {
    fn parse(
        &self,
        classificator: Arc<Classificator>,
        line: &str,
    ) -> Result<Box<dyn Record>, ParseError> {
        let expected = self.schema.fields().len();
        // one extra piece so that surplus separators are detected
        let parts: Vec<&str> = line.splitn(expected + 1, self.separator.as_str()).collect();
        if parts.len() != expected {
            return Err(ParseError::FieldCount {
                expected,
                found: parts.len(),
            });
        }

        let values = parts.into_iter().map(FieldValue::from).collect();
        let line = Line::new(Arc::clone(&self.schema), classificator, values)?;
        Ok(Box::new(line))
    }

    fn kind(&self) -> &'static str {
        "delimited"
    }
}
