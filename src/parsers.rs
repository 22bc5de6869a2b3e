use crate::classifier::Classificator;
use crate::error::ParseError;
use crate::record::Record;
use std::sync::Arc;

/// Common interface for all dialect record factories
pub trait RecordFactory: Send + Sync {
    /// Decompose one raw line into a record owned by `classificator`'s dialect
    fn parse(
        &self,
        classificator: Arc<Classificator>,
        line: &str,
    ) -> Result<Box<dyn Record>, ParseError>;

    /// Registry class name of this factory
    fn kind(&self) -> &'static str;
}

// Re-export individual parser modules
pub mod delimited_parser;
pub mod json_parser;
pub mod logfmt_parser;
pub mod regex_parser;

pub use delimited_parser::DelimitedParser;
pub use json_parser::JsonParser;
pub use logfmt_parser::LogfmtParser;
pub use regex_parser::RegexParser;
