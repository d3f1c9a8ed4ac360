//! Chunked streaming of local files into arbitrary output sinks.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use contract::Result;

use crate::progress::{ProgressSink, ProgressTracker, TRANSFER_CHUNK_100_KB};

/// Streams a source file into an output sink with progress reporting.
///
/// The output is always closed (dropped) before `upload` returns. If the
/// stream does not finish, the cleanup callback runs exactly once with the
/// source file, after the output has been closed.
pub struct FileUploader {
    progress: Arc<dyn ProgressSink>,
    chunk_size: usize,
}

impl FileUploader {
    /// Create an uploader reporting to the given sink.
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            progress,
            chunk_size: TRANSFER_CHUNK_100_KB,
        }
    }

    /// Override the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Copy `file` into `output`. Returns the number of bytes written.
    pub fn upload<W, C>(&self, file: &Path, output: W, cleanup: C) -> Result<u64>
    where
        W: Write,
        C: FnOnce(&Path),
    {
        let mut guard = CleanupGuard {
            file,
            cleanup: Some(cleanup),
            finished: false,
        };
        // Declared after the guard so it is dropped first.
        let mut output = output;

        let written = self.stream(file, &mut output)?;
        guard.finished = true;
        Ok(written)
    }

    fn stream<W: Write>(&self, file: &Path, output: &mut W) -> Result<u64> {
        let mut input = File::open(file)?;
        let total = input.metadata()?.len();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut tracker = ProgressTracker::new(self.progress.as_ref(), "Uploading", &name, total);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let read = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            output.write_all(&buf[..read])?;
            tracker.advance(read as u64);
        }

        output.flush()?;
        Ok(tracker.processed())
    }
}

struct CleanupGuard<'a, C: FnOnce(&Path)> {
    file: &'a Path,
    cleanup: Option<C>,
    finished: bool,
}

impl<C: FnOnce(&Path)> Drop for CleanupGuard<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(cleanup) = self.cleanup.take() {
            tracing::debug!(file = ?self.file, "Upload did not finish, running cleanup");
            cleanup(self.file);
        }
    }
}
