//! Progress accounting for chunked transfers.
//!
//! Rendering is left to a [`ProgressSink`]. The default sink emits tracing
//! events; tests and embedding tools can collect messages instead.

use std::io::{Read, Write};

use contract::Result;

/// Size of one kilobyte used for progress throttling.
pub const KILOBYTE: u64 = 1024;

/// Chunk size for streamed transfers (100KB).
pub const TRANSFER_CHUNK_100_KB: usize = 100 * 1024;

/// Receiver of human-readable progress updates.
pub trait ProgressSink: Send + Sync {
    /// Report a progress message.
    fn progress(&self, message: &str);
}

/// Progress sink writing to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn progress(&self, message: &str) {
        tracing::info!(target: "ferry::progress", "{}", message);
    }
}

/// Tracks cumulative bytes of a single transfer and reports once per whole
/// kilobyte of progress.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    operation: &'a str,
    name: &'a str,
    total: u64,
    processed: u64,
    logged_kb: u64,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker. A `total` of zero means the length is unknown.
    pub fn new(sink: &'a dyn ProgressSink, operation: &'a str, name: &'a str, total: u64) -> Self {
        Self {
            sink,
            operation,
            name,
            total,
            processed: 0,
            logged_kb: 0,
        }
    }

    /// Account for `read` more bytes.
    pub fn advance(&mut self, read: u64) {
        self.processed += read;

        let processed_kb = self.processed / KILOBYTE;
        if processed_kb > self.logged_kb {
            self.sink.progress(&self.message());
            self.logged_kb = processed_kb;
        }
    }

    /// Bytes processed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    fn message(&self) -> String {
        if self.total > 0 {
            format!(
                "{}: {} | {}/{} ({})",
                self.operation,
                self.name,
                format_size(self.processed),
                format_size(self.total),
                percent(self.processed, self.total)
            )
        } else {
            format!(
                "{}: {} | {}",
                self.operation,
                self.name,
                format_size(self.processed)
            )
        }
    }
}

/// Copy `reader` into `writer` in 100KB chunks, reporting progress.
///
/// Returns the number of bytes copied. The writer is flushed but not closed.
pub fn copy_with_progress<R, W>(
    operation: &str,
    name: &str,
    total: u64,
    reader: &mut R,
    writer: &mut W,
    sink: &dyn ProgressSink,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut tracker = ProgressTracker::new(sink, operation, name, total);
    let mut buf = vec![0u8; TRANSFER_CHUNK_100_KB];

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buf[..read])?;
        tracker.advance(read as u64);
    }

    writer.flush()?;
    Ok(tracker.processed())
}

/// Render a byte count using binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < KILOBYTE {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= KILOBYTE as f64 && unit < UNITS.len() - 1 {
        value /= KILOBYTE as f64;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Render `current` as a whole percentage of `total`.
pub fn percent(current: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    let value = (current as u128 * 100 / total as u128).min(100);
    format!("{}%", value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink collecting every message, shared with other test modules.
    #[derive(Default)]
    pub(crate) struct CollectingProgress {
        pub(crate) messages: Mutex<Vec<String>>,
    }

    impl CollectingProgress {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl ProgressSink for CollectingProgress {
        fn progress(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(250 * 1024), "250.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 100), "0%");
        assert_eq!(percent(40, 100), "40%");
        assert_eq!(percent(250, 250), "100%");
        assert_eq!(percent(5, 0), "0%");
    }

    #[test]
    fn test_tracker_reports_once_per_kilobyte() {
        let sink = CollectingProgress::default();
        let mut tracker = ProgressTracker::new(&sink, "Uploading", "a.bin", 4096);

        tracker.advance(512);
        assert!(sink.messages().is_empty());

        tracker.advance(512);
        assert_eq!(sink.messages().len(), 1);

        // Still inside the second kilobyte
        tracker.advance(100);
        assert_eq!(sink.messages().len(), 1);

        tracker.advance(3000);
        assert_eq!(sink.messages().len(), 2);
        assert_eq!(
            sink.messages()[1],
            "Uploading: a.bin | 4.0 KB/4.0 KB (100%)"
        );
    }

    #[test]
    fn test_tracker_without_total() {
        let sink = CollectingProgress::default();
        let mut tracker = ProgressTracker::new(&sink, "Downloading", "stream", 0);

        tracker.advance(2048);
        assert_eq!(sink.messages(), vec!["Downloading: stream | 2.0 KB"]);
    }

    #[test]
    fn test_copy_with_progress() {
        let sink = CollectingProgress::default();
        let data = vec![7u8; 300 * 1024];
        let mut output = Vec::new();

        let copied = copy_with_progress(
            "Downloading",
            "blob",
            data.len() as u64,
            &mut data.as_slice(),
            &mut output,
            &sink,
        )
        .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(output, data);
        let messages = sink.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].ends_with("(100%)"));
    }
}
