//! Dialects and the registry of record classes that builds them.

use crate::classifier::Classificator;
use crate::config::{expand_config_paths, load_dialect_file, DialectConfig};
use crate::error::{ConfigError, ParseError};
use crate::parsers::{DelimitedParser, JsonParser, LogfmtParser, RecordFactory, RegexParser};
use crate::record::Record;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Builds a record factory from a dialect's configuration
pub type FactoryBuilder =
    Box<dyn Fn(&DialectConfig) -> Result<Box<dyn RecordFactory>, ConfigError> + Send + Sync>;

/// A record factory bound to the classificator its records use
pub struct Dialect {
    name: String,
    factory: Box<dyn RecordFactory>,
    classificator: Arc<Classificator>,
}

impl Dialect {
    pub fn new(
        name: impl Into<String>,
        factory: Box<dyn RecordFactory>,
        classificator: Classificator,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            classificator: Arc::new(classificator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.factory.kind()
    }

    pub fn classificator(&self) -> &Arc<Classificator> {
        &self.classificator
    }

    pub fn parse(&self, line: &str) -> Result<Box<dyn Record>, ParseError> {
        self.factory.parse(Arc::clone(&self.classificator), line)
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("name", &self.name)
            .field("class", &self.factory.kind())
            .field("rules", &self.classificator.len())
            .finish()
    }
}

/// Maps `class` names to factory builders
pub struct DialectRegistry {
    builders: BTreeMap<String, FactoryBuilder>,
}

impl DialectRegistry {
    /// An empty registry; see [`DialectRegistry::with_builtins`]
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Registry with the `delimited`, `regex`, `logfmt` and `json` classes
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("delimited", |config| {
            Ok(Box::new(DelimitedParser::from_config(config)?))
        });
        registry.register("regex", |config| Ok(Box::new(RegexParser::from_config(config)?)));
        registry.register("logfmt", |config| Ok(Box::new(LogfmtParser::from_config(config)?)));
        registry.register("json", |config| Ok(Box::new(JsonParser::from_config(config)?)));
        registry
    }

    /// Add or replace a record class
    pub fn register<F>(&mut self, class: impl Into<String>, builder: F)
    where
        F: Fn(&DialectConfig) -> Result<Box<dyn RecordFactory>, ConfigError> + Send + Sync + 'static,
    {
        self.builders.insert(class.into(), Box::new(builder));
    }

    pub fn classes(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    /// Build the factory and classificator for one dialect
    pub fn build(&self, config: &DialectConfig) -> Result<Dialect, ConfigError> {
        let builder = self
            .builders
            .get(&config.class)
            .ok_or_else(|| ConfigError::UnknownClass {
                dialect: config.dialect.clone(),
                class: config.class.clone(),
                known: self.builders.keys().cloned().collect(),
            })?;

        let factory = builder(config)?;
        let classificator = Classificator::from_descriptors(&config.rule_descriptors()?)?;
        info!(
            dialect = %config.dialect,
            class = %config.class,
            rules = classificator.len(),
            "dialect loaded"
        );
        Ok(Dialect::new(config.dialect.clone(), factory, classificator))
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Dialect, ConfigError> {
        self.build(&load_dialect_file(path)?)
    }

    /// Load every dialect file named by the (possibly glob) arguments, in order
    pub fn load_all(&self, patterns: &[PathBuf]) -> Result<Vec<Dialect>, ConfigError> {
        expand_config_paths(patterns)?
            .iter()
            .map(|path| self.load_file(path))
            .collect()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}
