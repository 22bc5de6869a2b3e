use crate::sanitizer::LineOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Sanitizing statistics for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitizeStatistics {
    /// Total number of lines read
    pub total_lines: usize,
    /// Number of rows written to the sink
    pub emitted_rows: usize,
    /// Number of lines suppressed by a drop rule
    pub dropped_lines: usize,
    /// Number of lines no dialect claimed
    pub unclassified_lines: usize,
    /// Lines claimed per dialect, emitted or dropped
    pub dialect_distribution: BTreeMap<String, usize>,
    /// Wall-clock processing time
    pub elapsed_micros: u64,
}

impl SanitizeStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_emitted(&mut self, dialect: &str) {
        self.total_lines += 1;
        self.emitted_rows += 1;
        *self.dialect_distribution.entry(dialect.to_string()).or_insert(0) += 1;
    }

    pub fn record_dropped(&mut self, dialect: &str) {
        self.total_lines += 1;
        self.dropped_lines += 1;
        *self.dialect_distribution.entry(dialect.to_string()).or_insert(0) += 1;
    }

    pub fn record_unclassified(&mut self) {
        self.total_lines += 1;
        self.unclassified_lines += 1;
    }

    pub fn record_outcome(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Emitted { dialect, .. } => self.record_emitted(dialect),
            LineOutcome::Dropped { dialect } => self.record_dropped(dialect),
            LineOutcome::Unclassified => self.record_unclassified(),
        }
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    }

    fn rate(&self, count: usize) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (count as f64 / self.total_lines as f64) * 100.0
        }
    }

    /// Emitted rows as a percentage of all lines
    pub fn emit_rate(&self) -> f64 {
        self.rate(self.emitted_rows)
    }

    pub fn drop_rate(&self) -> f64 {
        self.rate(self.dropped_lines)
    }

    pub fn unclassified_rate(&self) -> f64 {
        self.rate(self.unclassified_lines)
    }

    pub fn throughput(&self) -> Option<f64> {
        (self.elapsed_micros > 0)
            .then(|| self.total_lines as f64 / (self.elapsed_micros as f64 / 1_000_000.0))
    }

    /// Generate a plain-text report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Sanitize Statistics Report ===\n");
        report.push_str(&format!("Total lines processed: {}\n", self.total_lines));
        report.push_str(&format!(
            "Emitted rows: {} ({:.2}%)\n",
            self.emitted_rows,
            self.emit_rate()
        ));
        report.push_str(&format!(
            "Dropped by rule: {} ({:.2}%)\n",
            self.dropped_lines,
            self.drop_rate()
        ));
        report.push_str(&format!(
            "Unclassified: {} ({:.2}%)\n",
            self.unclassified_lines,
            self.unclassified_rate()
        ));

        report.push_str("\n--- Dialect Distribution ---\n");
        for (dialect, count) in &self.dialect_distribution {
            report.push_str(&format!("{}: {} ({:.2}%)\n", dialect, count, self.rate(*count)));
        }

        if let Some(throughput) = self.throughput() {
            report.push_str("\n--- Performance Metrics ---\n");
            report.push_str(&format!("Total processing time: {}μs\n", self.elapsed_micros));
            report.push_str(&format!("Throughput: {:.2} lines/second\n", throughput));
        }

        report
    }
}
