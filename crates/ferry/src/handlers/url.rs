//! Generic URL handler: catch-all for any `scheme://` URL.
//!
//! Supports reading `file://` URLs and anonymous HTTP(S) downloads. Every
//! other operation or scheme is unsupported.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::url::Url;
use contract::{join_url, FileEntry, FileTransfer, Result, TransferError};

use super::{HandlerInfo, HttpClient};
use crate::progress::{copy_with_progress, ProgressSink, TracingProgress};

/// Handler for arbitrary URLs.
pub struct UrlTransfer {
    info: HandlerInfo,
    /// Request settings for HTTP(S) URLs. Never carries credentials.
    pub client: HttpClient,
    progress: Arc<dyn ProgressSink>,
}

impl Default for UrlTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlTransfer {
    /// Handler name.
    pub const NAME: &'static str = "url";

    /// Create the handler.
    pub fn new() -> Self {
        Self {
            info: HandlerInfo::builtin(Self::NAME, &["*://*"]),
            client: HttpClient::default(),
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

    fn parse(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| TransferError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn local_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path().map_err(|_| TransferError::InvalidUrl {
        url: url.to_string(),
        reason: "not a local file URL".to_string(),
    })
}

impl FileTransfer for UrlTransfer {
    fn handles(&self, file_url: &str) -> bool {
        self.info.matches(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let full = join_url(dir_url, file_name);
        let url = Self::parse(&full)?;

        match url.scheme() {
            "file" => {
                let source = local_path(&url)?;
                let mut input =
                    File::open(&source).map_err(|e| TransferError::protocol(Self::NAME, &full, e))?;
                let total = input.metadata()?.len();
                let mut output = File::create(target)?;
                copy_with_progress(
                    "Downloading",
                    file_name,
                    total,
                    &mut input,
                    &mut output,
                    self.progress.as_ref(),
                )?;
                Ok(())
            }
            "http" | "https" => {
                if self.client.fetch(&full, target, self.progress.as_ref())? {
                    Ok(())
                } else {
                    Err(TransferError::protocol(
                        Self::NAME,
                        full,
                        "server responded 404 Not Found",
                    ))
                }
            }
            _ => Err(TransferError::unsupported(Self::NAME, "download")),
        }
    }

    fn upload_to(&self, _dir_url: &str, _file_name: &str, _source: &Path) -> Result<()> {
        Err(TransferError::unsupported(Self::NAME, "upload"))
    }

    fn delete_from(&self, _dir_url: &str, _file_name: &str) -> Result<()> {
        Err(TransferError::unsupported(Self::NAME, "delete"))
    }

    fn truncate(&self, _dir_url: &str) -> Result<()> {
        Err(TransferError::unsupported(Self::NAME, "truncate"))
    }

    fn list(&self, _dir_url: &str) -> Result<Vec<FileEntry>> {
        Err(TransferError::unsupported(Self::NAME, "list"))
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        let url = Self::parse(&join_url(dir_url, file_name))?;
        if url.scheme() != "file" {
            return Err(TransferError::unsupported(Self::NAME, "stat"));
        }

        match fs::metadata(local_path(&url)?) {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some(FileEntry::from_metadata(file_name, &metadata)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_url(path: &Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[test]
    fn test_handles_any_scheme() {
        let transfer = UrlTransfer::new();
        assert!(transfer.handles("ftp://mirror/pub/a.tar.gz"));
        assert!(transfer.handles("file:///tmp/a.zip"));
        assert!(!transfer.handles("/tmp/a.zip"));
    }

    #[test]
    fn test_download_file_url() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        fs::write(&source, b"local content").unwrap();

        let transfer = UrlTransfer::new();
        let target = temp_dir.path().join("copy.txt");
        transfer.download(&file_url(&source), &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"local content");
    }

    #[test]
    fn test_stat_file_url() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("present.txt");
        fs::write(&source, b"12345").unwrap();

        let transfer = UrlTransfer::new();
        let entry = transfer.stat_url(&file_url(&source)).unwrap().unwrap();
        assert_eq!(entry.name(), "present.txt");
        assert_eq!(entry.size(), Some(5));

        let missing = temp_dir.path().join("absent.txt");
        assert!(transfer.stat_url(&file_url(&missing)).unwrap().is_none());
    }

    #[test]
    fn test_unsupported_scheme_and_operations() {
        let temp_dir = TempDir::new().unwrap();
        let transfer = UrlTransfer::new();

        let result = transfer.download("ftp://mirror/pub/a.tar.gz", &temp_dir.path().join("a"));
        assert!(result.unwrap_err().is_unsupported());
        assert!(transfer.stat_url("ftp://mirror/pub/a.tar.gz").unwrap_err().is_unsupported());
        assert!(transfer.delete("ftp://mirror/pub/a.tar.gz").unwrap_err().is_unsupported());
    }
}
