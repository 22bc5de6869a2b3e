//! Multi-dialect detection and the line pipeline.

use crate::config::expand_config_paths;
use crate::dialect::{Dialect, DialectRegistry};
use crate::error::{ConfigError, SanitizerError};
use crate::models::Row;
use crate::record::Record;
use crate::rule::Outcome;
use crate::statistics::SanitizeStatistics;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, trace};

/// Destination of emitted rows
pub trait RowSink {
    fn write_row(&mut self, row: &Row) -> Result<(), SanitizerError>;

    fn flush(&mut self) -> Result<(), SanitizerError> {
        Ok(())
    }
}

impl RowSink for Vec<Row> {
    fn write_row(&mut self, row: &Row) -> Result<(), SanitizerError> {
        self.push(row.clone());
        Ok(())
    }
}

/// The dialect that claimed a line, with its parsed record
#[derive(Debug)]
pub struct Detection<'a> {
    pub dialect: &'a Dialect,
    pub record: Box<dyn Record>,
}

/// What happened to one input line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Classified (or passed through unmodified) and projected to a row
    Emitted { dialect: String, row: Row },
    /// Suppressed by a drop rule
    Dropped { dialect: String },
    /// No dialect parsed the line into a valid, eligible record
    Unclassified,
}

/// Ordered dialect list; the first dialect that claims a line wins
#[derive(Debug)]
pub struct Sanitizer {
    dialects: Vec<Dialect>,
}

impl Sanitizer {
    pub fn new(dialects: Vec<Dialect>) -> Self {
        Self { dialects }
    }

    /// Load dialect files (glob patterns allowed) in argument order
    pub fn from_config_paths(
        registry: &DialectRegistry,
        patterns: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        let files = expand_config_paths(patterns)?;
        let dialects = files
            .iter()
            .map(|path| registry.load_file(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(dialects))
    }

    pub fn dialects(&self) -> &[Dialect] {
        &self.dialects
    }

    /// Find the first dialect that parses the line into a valid record.
    ///
    /// Parse and validation failures just move on to the next dialect.
    pub fn detect(&self, line: &str) -> Option<Detection<'_>> {
        for dialect in &self.dialects {
            match dialect.parse(line) {
                Ok(record) if record.is_type() && record.is_production() => {
                    return Some(Detection { dialect, record });
                }
                Ok(_) => trace!(dialect = %dialect.name(), "record failed validation"),
                Err(e) => trace!(dialect = %dialect.name(), error = %e, "parse failed"),
            }
        }
        None
    }

    /// Run one line through detection and classification
    pub fn classify_line(&self, line: &str) -> LineOutcome {
        let Detection { dialect, mut record } = match self.detect(line) {
            Some(detection) => detection,
            None => return LineOutcome::Unclassified,
        };

        match record.classify() {
            Outcome::Dropped => {
                debug!(dialect = %dialect.name(), "line dropped by rule");
                LineOutcome::Dropped {
                    dialect: dialect.name().to_string(),
                }
            }
            Outcome::Applied | Outcome::Unmatched => LineOutcome::Emitted {
                dialect: dialect.name().to_string(),
                row: record.get_row(),
            },
        }
    }

    /// Process every line of `reader` in order, writing rows to `sink`
    pub fn process_reader<R: BufRead>(
        &self,
        mut reader: R,
        sink: &mut dyn RowSink,
        stats: &mut SanitizeStatistics,
    ) -> Result<(), SanitizerError> {
        let start = Instant::now();
        let mut buf = Vec::new();
        while let Some(line) = read_line(&mut reader, &mut buf)? {
            emit(self.classify_line(&line), sink, stats)?;
        }
        sink.flush()?;
        stats.set_elapsed(start.elapsed());
        Ok(())
    }
}

/// Read one line without its terminator, decoding invalid UTF-8 lossily
pub(crate) fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

pub(crate) fn emit(
    outcome: LineOutcome,
    sink: &mut dyn RowSink,
    stats: &mut SanitizeStatistics,
) -> Result<(), SanitizerError> {
    stats.record_outcome(&outcome);
    if let LineOutcome::Emitted { row, .. } = outcome {
        sink.write_row(&row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialectConfig;
    use crate::models::FieldValue;
    use std::io::Cursor;

    fn sanitizer() -> Sanitizer {
        let config = DialectConfig::from_yaml_str(
            r#"
dialect: webapp
class: delimited
fields: [timestamp, service_name, user_id]
row: [timestamp, user_id, event]
classifications:
  - match_user_id: 43
    ignore: true
  - pattern_service_name: !regexp '(\w+)_production'
    event: 'ComeFrom.{0}'
"#,
            "webapp.yml",
        )
        .unwrap();
        let dialect = DialectRegistry::with_builtins().build(&config).unwrap();
        Sanitizer::new(vec![dialect])
    }

    #[test]
    fn test_detect_reports_dialect() {
        let s = sanitizer();
        let detection = s.detect("2016-01-01 14:32,noxy_production,22").unwrap();
        assert_eq!(detection.dialect.name(), "webapp");
        assert!(s.detect("2016-01-01 14:32,22").is_none());
        assert!(s.detect("2016-01-01 14:32,,22").is_none());
    }

    #[test]
    fn test_classify_line_outcomes() {
        let s = sanitizer();
        assert_eq!(
            s.classify_line("2016-01-01 14:32,noxy_production,22"),
            LineOutcome::Emitted {
                dialect: "webapp".to_string(),
                row: vec!["2016-01-01 14:32".into(), "22".into(), "ComeFrom.noxy".into()],
            }
        );
        assert_eq!(
            s.classify_line("2016-01-01 14:32,noxy_production,43"),
            LineOutcome::Dropped {
                dialect: "webapp".to_string()
            }
        );
        assert_eq!(
            s.classify_line("2016-01-01 14:32,noxy_staging,45"),
            LineOutcome::Emitted {
                dialect: "webapp".to_string(),
                row: vec!["2016-01-01 14:32".into(), "45".into(), FieldValue::Null],
            }
        );
        assert_eq!(s.classify_line("garbage"), LineOutcome::Unclassified);
    }

    #[test]
    fn test_read_line_strips_terminators() {
        let mut reader = Cursor::new(b"a,b\r\nc\n\nlast".to_vec());
        let mut buf = Vec::new();
        let mut lines = Vec::new();
        while let Some(line) = read_line(&mut reader, &mut buf).unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["a,b", "c", "", "last"]);
    }

    #[test]
    fn test_process_reader() {
        let input = "2016-01-01 14:32,noxy_production,22\n\
                     2016-01-01 14:33,noxy_production,43\n\
                     not a log line\n\
                     2016-01-01 14:34,api_production,7\r\n";
        let mut rows: Vec<Row> = Vec::new();
        let mut stats = SanitizeStatistics::new();
        sanitizer()
            .process_reader(Cursor::new(input), &mut rows, &mut stats)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], FieldValue::from("ComeFrom.api"));
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.dropped_lines, 1);
        assert_eq!(stats.unclassified_lines, 1);
    }

    #[test]
    fn test_invalid_utf8_does_not_abort() {
        let mut input = b"2016-01-01 14:32,noxy_production,22\n".to_vec();
        input.extend_from_slice(b"\xff\xfe,broken\n");
        input.extend_from_slice(b"2016-01-01 14:35,noxy_production,\xc3\xa9\n");

        let mut rows: Vec<Row> = Vec::new();
        let mut stats = SanitizeStatistics::new();
        sanitizer()
            .process_reader(Cursor::new(input), &mut rows, &mut stats)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], FieldValue::from("é"));
    }
}
