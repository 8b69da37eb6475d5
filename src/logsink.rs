//! Line-oriented log sink for run progress and the final summary.
//!
//! The pipeline reports everything a user sees through a single
//! [`LogSink::record`] call per line. Timestamp formatting, console
//! filtering (quiet mode, the `"Error:"` marker), and file handling all
//! live in the sink implementation, never in the pipeline itself — the
//! library stays testable with an in-memory sink and the CLI decides how
//! lines reach the terminal and the log file.
//!
//! Lines that carry the literal marker `"Error:"` must always be surfaced
//! by console-printing implementations, regardless of any quiet setting.

use std::sync::Mutex;

/// Receives one log line at a time from the run driver.
///
/// Implementations must be `Send + Sync`: page workers record lines
/// concurrently when OCR runs in the bounded worker pool.
pub trait LogSink: Send + Sync {
    /// Record a single line. The line carries no timestamp; implementations
    /// prepend one if they want it.
    fn record(&self, line: &str);
}

/// A sink that discards everything.
///
/// This is the default when no sink is configured.
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&self, _line: &str) {}
}

/// A sink that stores lines in memory, in arrival order.
///
/// Intended for tests that assert on what a run logged.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink poisoned").clone()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .expect("sink poisoned")
            .iter()
            .any(|l| l.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn record(&self, line: &str) {
        self.lines.lock().expect("sink poisoned").push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.record("first");
        sink.record("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert!(sink.contains("sec"));
        assert!(!sink.contains("third"));
    }

    #[test]
    fn null_sink_accepts_lines() {
        let sink = NullSink;
        sink.record("dropped");
    }

    #[test]
    fn sink_is_usable_across_threads() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || sink.record(&format!("line {i}")))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.lines().len(), 4);
    }
}
