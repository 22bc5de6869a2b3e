use crate::error::SanitizerError;
use crate::models::{FieldValue, Row};
use crate::sanitizer::RowSink;
use crate::statistics::SanitizeStatistics;
use colored::*;
use std::io::Write;

/// Delimited output; rows may differ in length between dialects
pub struct CsvRowSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvRowSink<W> {
    pub fn new(writer: W, separator: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(separator)
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        Self { writer }
    }
}

impl<W: Write> RowSink for CsvRowSink<W> {
    fn write_row(&mut self, row: &Row) -> Result<(), SanitizerError> {
        self.writer.write_record(row.iter().map(FieldValue::to_text))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SanitizerError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON array per row, values keeping their types
pub struct NdjsonRowSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonRowSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RowSink for NdjsonRowSink<W> {
    fn write_row(&mut self, row: &Row) -> Result<(), SanitizerError> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SanitizerError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

/// Colored run summary on stderr, so it never mixes with row output
pub fn print_stats_summary(stats: &SanitizeStatistics) {
    let total = stats.total_lines;
    eprintln!("\n{}", "═".repeat(50).cyan());
    eprintln!("{}", "SUMMARY".cyan().bold());
    eprintln!("{}", "═".repeat(50).cyan());
    eprintln!("Total lines:      {}", total.to_string().white().bold());
    eprintln!(
        "Emitted rows:     {} ({:.1}%)",
        stats.emitted_rows.to_string().green(),
        percent(stats.emitted_rows, total)
    );
    eprintln!(
        "Dropped by rule:  {} ({:.1}%)",
        stats.dropped_lines.to_string().yellow(),
        percent(stats.dropped_lines, total)
    );
    eprintln!(
        "Unclassified:     {} ({:.1}%)",
        stats.unclassified_lines.to_string().red(),
        percent(stats.unclassified_lines, total)
    );

    if !stats.dialect_distribution.is_empty() {
        eprintln!("\n{}:", "Dialect Distribution".dimmed());
        for (dialect, count) in &stats.dialect_distribution {
            eprintln!("  {}: {} ({:.1}%)", dialect.white(), count, percent(*count, total));
        }
    }

    if let Some(throughput) = stats.throughput() {
        eprintln!("\nThroughput:       {:.0} lines/second", throughput);
    }
}
