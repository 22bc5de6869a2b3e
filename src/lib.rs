pub mod models;
pub mod error;
pub mod config;
pub mod matcher;
pub mod rule;
pub mod classifier;
pub mod record;
pub mod parsers;
pub mod dialect;
pub mod sanitizer;
pub mod parallel;
pub mod statistics;
pub mod logging;
pub mod cli;
pub mod commands;


pub use models::{FieldValue, Row};
pub use error::{ConfigError, ParseError, SanitizerError};
pub use config::{DialectConfig, RuleDescriptor, RuleValue};
pub use matcher::{Condition, Groups, Match};
pub use rule::{Assignment, Outcome, Rule};
pub use classifier::Classificator;
pub use record::{Line, Record, Schema};
pub use parsers::{DelimitedParser, JsonParser, LogfmtParser, RecordFactory, RegexParser};
pub use dialect::{Dialect, DialectRegistry};
pub use sanitizer::{Detection, LineOutcome, RowSink, Sanitizer};
pub use parallel::{ParallelConfig, ParallelSanitizer};
pub use statistics::SanitizeStatistics;
