//! User-registered handler built from closures.
//!
//! A custom handler is created by name and matches `<name>://*` until its
//! protocols are replaced. Operations without a closure are unsupported.

use std::path::Path;

use contract::{FileEntry, FileTransfer, Result, TransferError};

use super::HandlerInfo;

type DownloadFn = Box<dyn Fn(&str, &str, &Path) -> Result<()> + Send + Sync>;
type UploadFn = Box<dyn Fn(&str, &str, &Path) -> Result<()> + Send + Sync>;
type DeleteFn = Box<dyn Fn(&str, &str) -> Result<()> + Send + Sync>;
type ListFn = Box<dyn Fn(&str) -> Result<Vec<FileEntry>> + Send + Sync>;
type TruncateFn = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;
type StatFn = Box<dyn Fn(&str, &str) -> Result<Option<FileEntry>> + Send + Sync>;

/// Handler whose operations are supplied by the caller.
pub struct CustomTransfer {
    info: HandlerInfo,
    download: Option<DownloadFn>,
    upload: Option<UploadFn>,
    delete: Option<DeleteFn>,
    list: Option<ListFn>,
    truncate: Option<TruncateFn>,
    stat: Option<StatFn>,
}

impl CustomTransfer {
    /// Create an empty handler matching `<name>://*`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let pattern = format!("{}://*", globset::escape(&name));
        Self {
            info: HandlerInfo::builtin(&name, &[pattern.as_str()]),
            download: None,
            upload: None,
            delete: None,
            list: None,
            truncate: None,
            stat: None,
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

    /// Set the download operation: `(dir_url, file_name, target)`.
    pub fn on_download<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str, &str, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.download = Some(Box::new(f));
        self
    }

    /// Set the upload operation: `(dir_url, file_name, source)`.
    pub fn on_upload<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str, &str, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.upload = Some(Box::new(f));
        self
    }

    /// Set the delete operation: `(dir_url, file_name)`.
    pub fn on_delete<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.delete = Some(Box::new(f));
        self
    }

    /// Set the list operation.
    pub fn on_list<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Vec<FileEntry>> + Send + Sync + 'static,
    {
        self.list = Some(Box::new(f));
        self
    }

    /// Set the truncate operation.
    pub fn on_truncate<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.truncate = Some(Box::new(f));
        self
    }

    /// Set the stat operation: `(dir_url, file_name)`.
    pub fn on_stat<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Result<Option<FileEntry>> + Send + Sync + 'static,
    {
        self.stat = Some(Box::new(f));
        self
    }

    fn unsupported(&self, operation: &'static str) -> TransferError {
        TransferError::unsupported(self.info.name(), operation)
    }
}

impl std::fmt::Debug for CustomTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomTransfer")
            .field("info", &self.info)
            .field("download", &self.download.is_some())
            .field("upload", &self.upload.is_some())
            .field("delete", &self.delete.is_some())
            .field("list", &self.list.is_some())
            .field("truncate", &self.truncate.is_some())
            .field("stat", &self.stat.is_some())
            .finish()
    }
}

impl FileTransfer for CustomTransfer {
    fn handles(&self, file_url: &str) -> bool {
        self.info.matches(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        match &self.download {
            Some(f) => f(dir_url, file_name, target),
            None => Err(self.unsupported("download")),
        }
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        match &self.upload {
            Some(f) => f(dir_url, file_name, source),
            None => Err(self.unsupported("upload")),
        }
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        match &self.delete {
            Some(f) => f(dir_url, file_name),
            None => Err(self.unsupported("delete")),
        }
    }

    fn truncate(&self, dir_url: &str) -> Result<()> {
        match &self.truncate {
            Some(f) => f(dir_url),
            None => Err(self.unsupported("truncate")),
        }
    }

    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>> {
        match &self.list {
            Some(f) => f(dir_url),
            None => Err(self.unsupported("list")),
        }
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        match &self.stat {
            Some(f) => f(dir_url, file_name),
            None => Err(self.unsupported("stat")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_default_pattern_uses_name() {
        let transfer = CustomTransfer::new("s3");
        assert_eq!(transfer.info().name(), "s3");
        assert!(transfer.handles("s3://bucket/key.zip"));
        assert!(!transfer.handles("gs://bucket/key.zip"));
    }

    #[test]
    fn test_name_with_glob_characters_is_literal() {
        let transfer = CustomTransfer::new("a*b");
        assert!(transfer.handles("a*b://x/y"));
        assert!(!transfer.handles("axxb://x/y"));
    }

    #[test]
    fn test_closures_receive_split_url() {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut transfer = CustomTransfer::new("mem");
        transfer.on_download(move |dir_url, file_name, target| {
            assert_eq!(dir_url, "mem://bucket/dir");
            assert_eq!(file_name, "a.txt");
            seen.fetch_add(1, Ordering::SeqCst);
            std::fs::write(target, b"mem")?;
            Ok(())
        });

        let target = temp_dir.path().join("a.txt");
        transfer.download("mem://bucket/dir/a.txt", &target).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&target).unwrap(), b"mem");
    }

    #[test]
    fn test_missing_operations_are_unsupported() {
        let mut transfer = CustomTransfer::new("mem");
        transfer.on_stat(|_, name| Ok(Some(FileEntry::new(name))));

        assert!(transfer.stat_url("mem://b/x").unwrap().is_some());
        let err = transfer.list("mem://b").unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "file transfer 'mem' does not support operation 'list'"
        );
        assert!(transfer.delete("mem://b/x").unwrap_err().is_unsupported());
    }

    #[test]
    fn test_replaced_protocols() {
        let mut transfer = CustomTransfer::new("mirror");
        transfer
            .info_mut()
            .set_protocols(["https://mirror.internal/*"])
            .unwrap();

        assert!(transfer.handles("https://mirror.internal/pkg.zip"));
        assert!(!transfer.handles("mirror://pkg.zip"));
    }
}
