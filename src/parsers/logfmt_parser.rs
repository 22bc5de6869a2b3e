use crate::classifier::Classificator;
use crate::config::DialectConfig;
use crate::error::{ConfigError, ParseError};
use crate::models::FieldValue;
use crate::parsers::RecordFactory;
use crate::record::{Line, Record, Schema};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

const KEY_VALUE_PATTERN: &str = r#"([a-zA-Z0-9_.-]+)=(?:"((?:[^"\\]|\\.)*)"|([^\s]*))"#;

pub const DEFAULT_MIN_PAIRS: usize = 1;

/// Logfmt parser for key=value formatted logs
#[derive(Debug, Clone)]
pub struct LogfmtParser {
    key_value_regex: Regex,
    min_pairs: usize,
    schema: Arc<Schema>,
}

impl LogfmtParser {
    pub fn from_config(config: &DialectConfig) -> Result<Self, ConfigError> {
        let key_value_regex = Regex::new(KEY_VALUE_PATTERN).map_err(|e| ConfigError::Regex {
            key: "logfmt".to_string(),
            pattern: KEY_VALUE_PATTERN.to_string(),
            source: e,
        })?;
        Ok(Self {
            key_value_regex,
            min_pairs: config.min_pairs.unwrap_or(DEFAULT_MIN_PAIRS),
            schema: Arc::new(Schema::from_config(config, config.fields.clone())?),
        })
    }

    /// Extract key=value pairs in line order; quoted values are unescaped
    pub fn extract_pairs(&self, line: &str) -> Vec<(String, String)> {
        self.key_value_regex
            .captures_iter(line)
            .filter_map(|cap| {
                let key = cap.get(1)?.as_str().to_string();
                let value = match (cap.get(2), cap.get(3)) {
                    (Some(quoted), _) => unescape(quoted.as_str()),
                    (None, Some(bare)) => bare.as_str().to_string(),
                    (None, None) => String::new(),
                };
                Some((key, value))
            })
            .collect()
    }
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl RecordFactory for LogfmtParser {
    fn parse(
        &self,
        classificator: Arc<Classificator>,
        line: &str,
    ) -> Result<Box<dyn Record>, ParseError> {
        let pairs = self.extract_pairs(line);
        if pairs.len() < self.min_pairs || pairs.is_empty() {
            return Err(ParseError::LogfmtInsufficientPairs {
                found_pairs: pairs.len(),
                required_pairs: self.min_pairs.max(1),
            });
        }

        let mut values = vec![FieldValue::Null; self.schema.fields().len()];
        let mut extra = BTreeMap::new();
        for (key, value) in pairs {
            match self.schema.position(&key) {
                Some(idx) => values[idx] = FieldValue::Text(value),
                None => {
                    extra.insert(key, FieldValue::Text(value));
                }
            }
        }

        let line = Line::new(Arc::clone(&self.schema), classificator, values)?.with_extra(extra);
        Ok(Box::new(line))
    }

    fn kind(&self) -> &'static str {
        "logfmt"
    }
}
