use crate::cli::{Cli, OutputFormat};
use crate::commands::output::{print_stats_summary, CsvRowSink, NdjsonRowSink};
use crate::dialect::DialectRegistry;
use crate::error::SanitizerError;
use crate::parallel::{ParallelConfig, ParallelSanitizer};
use crate::sanitizer::{RowSink, Sanitizer};
use crate::statistics::SanitizeStatistics;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

pub fn run_sanitize(cli: &Cli) -> Result<SanitizeStatistics, SanitizerError> {
    let registry = DialectRegistry::with_builtins();
    let sanitizer = Sanitizer::from_config_paths(&registry, &cli.configs)?;
    info!(dialects = sanitizer.dialects().len(), "configuration loaded");

    let input: Box<dyn BufRead + Send> = match &cli.file {
        Some(path) => Box::new(BufReader::new(File::open(path).map_err(|e| open_error(path, e))?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| open_error(path, e))?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink: Box<dyn RowSink> = match cli.format {
        OutputFormat::Csv => Box::new(CsvRowSink::new(output, cli.separator)),
        OutputFormat::Ndjson => Box::new(NdjsonRowSink::new(output)),
    };

    let mut stats = SanitizeStatistics::new();
    if cli.jobs == 1 {
        sanitizer.process_reader(input, sink.as_mut(), &mut stats)?;
    } else {
        let config = ParallelConfig {
            num_threads: cli.jobs,
            batch_size: cli.batch_size,
            ..ParallelConfig::default()
        };
        ParallelSanitizer::new(sanitizer, config)?.process_reader(input, sink.as_mut(), &mut stats)?;
    }

    info!(
        total = stats.total_lines,
        emitted = stats.emitted_rows,
        dropped = stats.dropped_lines,
        unclassified = stats.unclassified_lines,
        "input processed"
    );
    if cli.stats {
        print_stats_summary(&stats);
    }
    Ok(stats)
}

fn open_error(path: &Path, source: io::Error) -> SanitizerError {
    SanitizerError::Open {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    const WEBAPP: &str = r#"
dialect: webapp
class: delimited
fields: [timestamp, service_name, user_id]
row: [timestamp, user_id, event]
classifications:
  - match_user_id: 43
    ignore: true
  - pattern_service_name: !regexp '(\w+)_production'
    event: 'ComeFrom.{0}'
"#;

    const INPUT: &str = "2016-01-01 14:32,noxy_production,22\n\
                         2016-01-01 14:33,noxy_production,43\n\
                         2016-01-01 14:34,22\n\
                         2016-01-01 14:35,api_staging,45\n";

    fn run(extra: &[&str]) -> (String, SanitizeStatistics) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("webapp.yml");
        let input = dir.path().join("input.log");
        let output = dir.path().join("out");
        fs::write(&config, WEBAPP).unwrap();
        fs::write(&input, INPUT).unwrap();

        let mut args = vec![
            "logsanitizer".to_string(),
            "-f".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|a| a.to_string()));
        args.push(dir.path().join("*.yml").display().to_string());

        let cli = Cli::try_parse_from(args).unwrap();
        let stats = run_sanitize(&cli).unwrap();
        (fs::read_to_string(&output).unwrap(), stats)
    }

    #[test]
    fn test_csv_output_with_custom_separator() {
        let (text, stats) = run(&["-s", ","]);
        assert_eq!(
            text,
            "2016-01-01 14:32,22,ComeFrom.noxy\n2016-01-01 14:35,45,\n"
        );
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.dropped_lines, 1);
        assert_eq!(stats.unclassified_lines, 1);
    }

    #[test]
    fn test_default_separator_is_control_a() {
        let (text, _) = run(&[]);
        assert_eq!(
            text.lines().next(),
            Some("2016-01-01 14:32\u{1}22\u{1}ComeFrom.noxy")
        );
    }

    #[test]
    fn test_ndjson_output_in_parallel() {
        let (text, stats) = run(&["--format", "ndjson", "-j", "2", "--batch-size", "1"]);
        assert_eq!(
            text,
            "[\"2016-01-01 14:32\",\"22\",\"ComeFrom.noxy\"]\n[\"2016-01-01 14:35\",\"45\",null]\n"
        );
        assert_eq!(stats.emitted_rows, 2);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("webapp.yml");
        fs::write(&config, WEBAPP).unwrap();
        let cli = Cli::try_parse_from([
            "logsanitizer".to_string(),
            "-f".to_string(),
            dir.path().join("missing.log").display().to_string(),
            config.display().to_string(),
        ])
        .unwrap();
        let err = run_sanitize(&cli).unwrap_err();
        assert!(matches!(err, SanitizerError::Open { .. }));
        assert!(err.to_string().contains("missing.log"));
    }

    #[test]
    fn test_bad_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bad.yml");
        fs::write(&config, "dialect: bad\nclass: xml\n").unwrap();
        let cli = Cli::try_parse_from(["logsanitizer".to_string(), config.display().to_string()]).unwrap();
        let err = run_sanitize(&cli).unwrap_err();
        assert!(matches!(err, SanitizerError::Config(_)));
    }
}
