//! Local filesystem handler for URLs without a scheme.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contract::{FileEntry, FileTransfer, Result};

use super::HandlerInfo;
use crate::progress::{copy_with_progress, ProgressSink, TracingProgress};
use crate::uploader::FileUploader;

/// Handler for local paths.
pub struct PathTransfer {
    info: HandlerInfo,
    progress: Arc<dyn ProgressSink>,
}

impl Default for PathTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTransfer {
    /// Handler name.
    pub const NAME: &'static str = "path";

    /// Create the handler.
    pub fn new() -> Self {
        Self {
            info: HandlerInfo::builtin(Self::NAME, &["*"]),
            progress: Arc::new(TracingProgress),
        }
    }

    /// Registration data.
    pub fn info(&self) -> &HandlerInfo {
        &self.info
    }

    /// Mutable registration data.
    pub fn info_mut(&mut self) -> &mut HandlerInfo {
        &mut self.info
    }

    /// Replace the progress sink.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) {
        self.progress = progress;
    }
}

fn file_path(dir_url: &str, file_name: &str) -> PathBuf {
    if dir_url.is_empty() {
        PathBuf::from(file_name)
    } else {
        Path::new(dir_url).join(file_name)
    }
}

impl FileTransfer for PathTransfer {
    fn handles(&self, file_url: &str) -> bool {
        !file_url.contains("://") && self.info.matches(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let source = file_path(dir_url, file_name);
        let mut input = File::open(&source)?;
        let total = input.metadata()?.len();
        let mut output = File::create(target)?;
        copy_with_progress(
            "Copying",
            file_name,
            total,
            &mut input,
            &mut output,
            self.progress.as_ref(),
        )?;
        Ok(())
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        let destination = file_path(dir_url, file_name);
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let output = File::create(&destination)?;
        FileUploader::new(self.progress.clone()).upload(source, output, |_| {
            if let Err(e) = fs::remove_file(&destination) {
                tracing::warn!(path = ?destination, error = %e, "Failed to remove partially copied file");
            }
        })?;
        Ok(())
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        fs::remove_file(file_path(dir_url, file_name))?;
        Ok(())
    }

    fn truncate(&self, dir_url: &str) -> Result<()> {
        for entry in fs::read_dir(dir_url)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir_url)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                entries.push(FileEntry::from_metadata(name, &metadata));
            }
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        match fs::metadata(file_path(dir_url, file_name)) {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some(FileEntry::from_metadata(file_name, &metadata)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
