use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logsanitizer")]
#[command(author, version, about = "Detect log line dialects, classify records with declarative rules and emit normalized rows")]
pub struct Cli {
    /// Dialect configuration files, tried in order (supports glob patterns)
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Input file (default: stdin)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Field separator byte; accepts \t, \NNN (octal) and \xHH escapes
    #[arg(long, short = 's', default_value = r"\x01", value_parser = parse_separator)]
    pub separator: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Number of worker threads (0 = auto-detect, 1 = sequential)
    #[arg(long, short = 'j', default_value = "1")]
    pub jobs: usize,

    /// Lines per batch when running in parallel
    #[arg(long, default_value = "1000")]
    pub batch_size: usize,

    /// Print a processing summary to stderr
    #[arg(long)]
    pub stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Delimited rows
    Csv,
    /// One JSON array per row
    Ndjson,
}

/// Parse a separator argument into a single byte
pub fn parse_separator(arg: &str) -> Result<u8, String> {
    let bytes = arg.as_bytes();
    match bytes {
        [byte] => Ok(*byte),
        [b'\\', b't'] => Ok(b'\t'),
        [b'\\', b'\\'] => Ok(b'\\'),
        [b'\\', b'x', hex @ ..] if !hex.is_empty() && hex.len() <= 2 => {
            u8::from_str_radix(&arg[2..], 16).map_err(|_| format!("invalid hex escape '{}'", arg))
        }
        [b'\\', octal @ ..] if !octal.is_empty() && octal.len() <= 3 => {
            u8::from_str_radix(&arg[1..], 8).map_err(|_| format!("invalid octal escape '{}'", arg))
        }
        _ => Err(format!("separator must be a single byte, got '{}'", arg)),
    }
}
