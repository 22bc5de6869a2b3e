use crate::classifier::Classificator;
use crate::config::DialectConfig;
use crate::error::{ConfigError, ParseError};
use crate::models::FieldValue;
use crate::parsers::RecordFactory;
use crate::record::{Line, Record, Schema};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// JSON parser for one-object-per-line structured logs
#[derive(Debug, Clone)]
pub struct JsonParser {
    schema: Arc<Schema>,
}

impl JsonParser {
    pub fn from_config(config: &DialectConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            schema: Arc::new(Schema::from_config(config, config.fields.clone())?),
        })
    }
}

/// Scalars keep their type; arrays and objects become compact JSON text
fn to_field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => n.as_f64().map_or(FieldValue::Text(n.to_string()), FieldValue::Float),
        },
        Value::String(s) => FieldValue::Text(s),
        nested => FieldValue::Text(nested.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RecordFactory for JsonParser {
    fn parse(
        &self,
        classificator: Arc<Classificator>,
        line: &str,
    ) -> Result<Box<dyn Record>, ParseError> {
        let value: Value = serde_json::from_str(line).map_err(|e| ParseError::JsonSyntax {
            message: e.to_string(),
            column: e.column(),
        })?;

        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ParseError::JsonNotObject {
                    actual_type: type_name(&other).to_string(),
                })
            }
        };

        let mut values = vec![FieldValue::Null; self.schema.fields().len()];
        let mut extra = BTreeMap::new();
        for (key, value) in object {
            let value = to_field_value(value);
            match self.schema.position(&key) {
                Some(idx) => values[idx] = value,
                None => {
                    extra.insert(key, value);
                }
            }
        }

        let line = Line::new(Arc::clone(&self.schema), classificator, values)?.with_extra(extra);
        Ok(Box::new(line))
    }

    fn kind(&self) -> &'static str {
        "json"
    }
}
