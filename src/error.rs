use thiserror::Error;

/// Reasons a dialect could not decompose a raw line into a record.
///
/// These are routine: the dispatcher swallows them and moves on to the
/// next dialect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The line split into the wrong number of parts
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// The dialect pattern did not match the line
    #[error("line does not match pattern '{pattern}'")]
    PatternMismatch { pattern: String },

    /// Logfmt line with too few key=value pairs
    #[error("insufficient logfmt pairs: found {found_pairs}, required {required_pairs}")]
    LogfmtInsufficientPairs {
        found_pairs: usize,
        required_pairs: usize,
    },

    /// JSON parsing failed with syntax error
    #[error("JSON syntax error: {message} at column {column}")]
    JsonSyntax { message: String, column: usize },

    /// JSON structure is valid but not an object
    #[error("JSON is not an object, found: {actual_type}")]
    JsonNotObject { actual_type: String },

    /// A timestamp field did not match the configured format
    #[error("field '{field}' value '{input}' does not match timestamp format '{format}'")]
    Timestamp {
        field: String,
        input: String,
        format: String,
    },

    /// Any other structural mismatch reported by a record factory
    #[error("malformed line: {reason}")]
    Malformed { reason: String },
}

/// Malformed dialect or rule configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config path pattern '{pattern}': {reason}")]
    Glob { pattern: String, reason: String },

    #[error("dialect '{dialect}': unknown class '{class}' (known: {})", .known.join(", "))]
    UnknownClass {
        dialect: String,
        class: String,
        known: Vec<String>,
    },

    #[error("{context}: invalid key '{key}': {reason}")]
    InvalidKey {
        context: String,
        key: String,
        reason: String,
    },

    #[error("{context}: invalid value for '{key}': {reason}")]
    InvalidValue {
        context: String,
        key: String,
        reason: String,
    },

    #[error("invalid regex for '{key}' ('{pattern}'): {source}")]
    Regex {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error for '{parameter}': {reason}")]
    Invalid { parameter: String, reason: String },
}

/// Top-level error for a sanitizer run.
#[derive(Debug, Error)]
pub enum SanitizerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}
