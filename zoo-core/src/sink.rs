//! Event sinks for simulation log lines
//!
//! Every component that reports an observable event holds a [`SharedSink`]
//! and calls [`EventSink::log`] exactly once per event. Multiple outputs are
//! combined with [`FanOutSink`].

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Destination for human-readable simulation events
pub trait EventSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Sink handle shared by all components
pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to `tracing` at INFO level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, message: &str) {
        info!(target: "zoo", "{}", message);
    }
}

/// Appends timestamped events to a file, one per line
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) the log file for appending
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn log(&self, message: &str) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut writer = self.writer.lock();
        let result = writeln!(writer, "{} {}", stamp, message).and_then(|_| writer.flush());
        if let Err(e) = result {
            warn!("Failed to write to log file {:?}: {}", self.path, e);
        }
    }
}

/// Broadcasts every event to each registered sink, in registration order
#[derive(Default, Clone)]
pub struct FanOutSink {
    sinks: Vec<SharedSink>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink to the broadcast list
    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanOutSink {
    fn log(&self, message: &str) {
        for sink in &self.sinks {
            sink.log(message);
        }
    }
}

/// Keeps every event in memory; used to inspect the event sequence
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Number of recorded lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }

    /// Index of the first line containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines.lock().iter().position(|l| l.contains(needle))
    }

    /// Index of the last line containing `needle`
    pub fn last_position(&self, needle: &str) -> Option<usize> {
        self.lines.lock().iter().rposition(|l| l.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn log(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fan_out_reaches_every_sink() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let fan_out = FanOutSink::new()
            .with(first.clone())
            .with(second.clone());

        fan_out.log("Leo: Rrr!");

        assert_eq!(fan_out.len(), 2);
        assert_eq!(first.lines(), vec!["Leo: Rrr!".to_string()]);
        assert_eq!(second.lines(), vec!["Leo: Rrr!".to_string()]);
    }

    #[test]
    fn test_file_sink_appends_timestamped_lines() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("log.txt");

        {
            let sink = FileSink::open(&path)?;
            sink.log("first");
        }
        {
            let sink = FileSink::open(&path)?;
            sink.log("second");
        }

        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));
        // "YYYY-MM-DD HH:MM:SS " prefix
        assert_eq!(lines[0].len(), "first".len() + 20);

        Ok(())
    }

    #[test]
    fn test_memory_sink_positions() {
        let sink = MemorySink::new();
        sink.log("a start");
        sink.log("b middle");
        sink.log("a end");

        assert_eq!(sink.count("a "), 2);
        assert_eq!(sink.position("a "), Some(0));
        assert_eq!(sink.last_position("a "), Some(2));
        assert_eq!(sink.position("missing"), None);
    }
}
