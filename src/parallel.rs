//! Batched parallel classification with order-preserving output.
//!
//! A reader thread feeds batches of lines through a bounded channel; each
//! batch is classified on a dedicated rayon pool and the outcomes are
//! emitted in input order, so the output matches sequential processing.

use crate::error::SanitizerError;
use crate::sanitizer::{emit, read_line, LineOutcome, RowSink, Sanitizer};
use crate::statistics::SanitizeStatistics;
use crossbeam_channel::{bounded, Sender};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Configuration for parallel processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of worker threads to use (0 = auto-detect)
    pub num_threads: usize,
    /// Lines per classification batch
    pub batch_size: usize,
    /// Batches buffered between the reader and the workers
    pub queue_capacity: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            batch_size: 1000,
            queue_capacity: 4,
        }
    }
}

pub struct ParallelSanitizer {
    sanitizer: Sanitizer,
    config: ParallelConfig,
    pool: ThreadPool,
}

impl ParallelSanitizer {
    pub fn new(sanitizer: Sanitizer, config: ParallelConfig) -> Result<Self, SanitizerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|idx| format!("sanitize-{}", idx))
            .build()?;
        debug!(threads = pool.current_num_threads(), batch_size = config.batch_size, "parallel pool ready");
        Ok(Self {
            sanitizer,
            config,
            pool,
        })
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Classify a batch on the pool; outcomes keep the batch order
    pub fn classify_batch(&self, lines: &[String]) -> Vec<LineOutcome> {
        self.pool.install(|| {
            lines
                .par_iter()
                .map(|line| self.sanitizer.classify_line(line))
                .collect()
        })
    }

    /// Classify everything `reader` yields and emit rows in input order.
    ///
    /// The reader runs on its own detached thread. When emission fails the
    /// error is returned right away; a reader still blocked on its input
    /// stops at its next send.
    pub fn process_reader<R: BufRead + Send + 'static>(
        &self,
        reader: R,
        sink: &mut dyn RowSink,
        stats: &mut SanitizeStatistics,
    ) -> Result<(), SanitizerError> {
        let start = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let (sender, receiver) = bounded::<io::Result<Vec<String>>>(self.config.queue_capacity.max(1));

        let reader_thread = thread::Builder::new()
            .name("sanitize-reader".to_string())
            .spawn(move || read_batches(reader, batch_size, sender))?;

        for batch in &receiver {
            for outcome in self.classify_batch(&batch?) {
                emit(outcome, sink, stats)?;
            }
        }
        reader_thread
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "reader thread panicked"))?;

        sink.flush()?;
        stats.set_elapsed(start.elapsed());
        Ok(())
    }
}

fn read_batches<R: BufRead>(mut reader: R, batch_size: usize, sender: Sender<io::Result<Vec<String>>>) {
    let mut buf = Vec::new();
    loop {
        let mut batch = Vec::with_capacity(batch_size);
        let mut failure = None;
        while batch.len() < batch_size {
            match read_line(&mut reader, &mut buf) {
                Ok(Some(line)) => batch.push(line),
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let exhausted = batch.len() < batch_size;
        // a closed channel means the consumer bailed out
        if !batch.is_empty() && sender.send(Ok(batch)).is_err() {
            return;
        }
        if let Some(e) = failure {
            let _ = sender.send(Err(e));
            return;
        }
        if exhausted {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialectConfig;
    use crate::dialect::DialectRegistry;
    use crate::models::{FieldValue, Row};
    use std::io::{BufReader, Cursor, Read};
    use std::sync::mpsc;

    fn sanitizer() -> Sanitizer {
        let config = DialectConfig::from_yaml_str(
            r#"
dialect: webapp
class: delimited
fields: [timestamp, service_name, user_id]
row: [timestamp, user_id, event]
classifications:
  - match_user_id: '3'
    ignore: true
  - pattern_service_name: !regexp '(\w+)_production'
    event: 'ComeFrom.{0}'
"#,
            "webapp.yml",
        )
        .unwrap();
        Sanitizer::new(vec![DialectRegistry::with_builtins().build(&config).unwrap()])
    }

    fn input(lines: usize) -> String {
        (0..lines)
            .map(|i| match i % 4 {
                0 => format!("2016-01-01 14:32,svc{}_production,{}", i, i % 7),
                1 => format!("2016-01-01 14:33,svc{}_staging,{}", i, i),
                2 => "not a log line".to_string(),
                _ => format!("2016-01-01 14:34,x_production,{}", i % 5),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn run_parallel(text: &str, config: ParallelConfig) -> (Vec<Row>, SanitizeStatistics) {
        let parallel = ParallelSanitizer::new(sanitizer(), config).unwrap();
        let mut rows: Vec<Row> = Vec::new();
        let mut stats = SanitizeStatistics::new();
        parallel
            .process_reader(Cursor::new(text.to_string()), &mut rows, &mut stats)
            .unwrap();
        (rows, stats)
    }

    #[test]
    fn test_matches_sequential_output() {
        let text = input(250);

        let mut expected: Vec<Row> = Vec::new();
        let mut expected_stats = SanitizeStatistics::new();
        sanitizer()
            .process_reader(Cursor::new(text.clone()), &mut expected, &mut expected_stats)
            .unwrap();

        let config = ParallelConfig {
            num_threads: 4,
            batch_size: 16,
            queue_capacity: 2,
        };
        let (rows, stats) = run_parallel(&text, config);
        assert_eq!(rows, expected);
        assert_eq!(stats.total_lines, 250);
        assert_eq!(stats.emitted_rows, expected_stats.emitted_rows);
        assert_eq!(stats.dropped_lines, expected_stats.dropped_lines);
        assert_eq!(stats.unclassified_lines, expected_stats.unclassified_lines);
    }

    #[test]
    fn test_partial_last_batch_and_zero_batch_size() {
        let text = input(7);
        let (rows, stats) = run_parallel(
            &text,
            ParallelConfig {
                num_threads: 2,
                batch_size: 0,
                queue_capacity: 0,
            },
        );
        assert_eq!(stats.total_lines, 7);
        assert_eq!(rows.len(), stats.emitted_rows);
    }

    #[test]
    fn test_empty_input() {
        let (rows, stats) = run_parallel("", ParallelConfig::default());
        assert!(rows.is_empty());
        assert_eq!(stats.total_lines, 0);
    }

    #[test]
    fn test_auto_thread_count() {
        let parallel = ParallelSanitizer::new(sanitizer(), ParallelConfig::default()).unwrap();
        assert!(parallel.num_threads() >= 1);
        assert_eq!(parallel.sanitizer().dialects().len(), 1);
    }

    #[test]
    fn test_classify_batch_keeps_order() {
        let parallel = ParallelSanitizer::new(
            sanitizer(),
            ParallelConfig {
                num_threads: 3,
                ..ParallelConfig::default()
            },
        )
        .unwrap();
        let lines: Vec<String> = (0..50)
            .map(|i| format!("2016-01-01 14:32,s{}_production,{}", i, i + 10))
            .collect();
        let outcomes = parallel.classify_batch(&lines);
        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                LineOutcome::Emitted { row, .. } => {
                    assert_eq!(row[2], FieldValue::from(format!("ComeFrom.s{}", i)))
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    /// Yields its prefix, then blocks until the gate is released
    struct GatedInput {
        prefix: Cursor<Vec<u8>>,
        gate: mpsc::Receiver<()>,
    }

    impl Read for GatedInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.prefix.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            let _ = self.gate.recv();
            Ok(0)
        }
    }

    struct ClosedSink;

    impl RowSink for ClosedSink {
        fn write_row(&mut self, _row: &Row) -> Result<(), SanitizerError> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed").into())
        }
    }

    #[test]
    fn test_sink_error_does_not_wait_for_input_end() {
        let (release, gate) = mpsc::channel();
        let input = GatedInput {
            prefix: Cursor::new(b"2016-01-01 14:32,noxy_production,22\n".to_vec()),
            gate,
        };
        let parallel = ParallelSanitizer::new(
            sanitizer(),
            ParallelConfig {
                num_threads: 2,
                batch_size: 1,
                queue_capacity: 1,
            },
        )
        .unwrap();

        let mut stats = SanitizeStatistics::new();
        let err = parallel
            .process_reader(BufReader::new(input), &mut ClosedSink, &mut stats)
            .unwrap_err();
        assert!(matches!(err, SanitizerError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(stats.total_lines, 1);
        drop(release);
    }
}
