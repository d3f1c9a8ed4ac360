//! The transfer contract implemented by every protocol handler.
//!
//! Handlers implement a small set of raw primitives addressed by a directory
//! URL and a file name. Operations addressed by a single file URL are derived
//! from them by splitting the URL at its last `/`.

use std::path::{Path, PathBuf};

use crate::entry::FileEntry;
use crate::error::{Result, TransferError};

/// Separator between the directory part and the file name of a URL.
pub const URL_DELIMITER: char = '/';

/// Split a file URL into its directory URL and file name.
///
/// Everything before the last `/` is the directory, the rest is the name.
/// A URL without any `/` yields an empty directory.
pub fn split_url(file_url: &str) -> (&str, &str) {
    match file_url.rfind(URL_DELIMITER) {
        Some(idx) => (&file_url[..idx], &file_url[idx + 1..]),
        None => ("", file_url),
    }
}

/// Join a directory URL and a file name back into a file URL.
pub fn join_url(dir_url: &str, file_name: &str) -> String {
    if dir_url.is_empty() {
        file_name.to_string()
    } else if dir_url.ends_with(URL_DELIMITER) {
        format!("{}{}", dir_url, file_name)
    } else {
        format!("{}{}{}", dir_url, URL_DELIMITER, file_name)
    }
}

/// Final segment of a URL.
pub fn name_from_url(file_url: &str) -> &str {
    split_url(file_url).1
}

/// Capability set every protocol handler exposes.
///
/// Implementations perform raw I/O only. Skipping work that is already done
/// and making downloads atomic is the job of the transfer manager.
pub trait FileTransfer: Send + Sync {
    /// Checks if the URL is served by this transfer. Must not perform I/O.
    fn handles(&self, file_url: &str) -> bool;

    /// Downloads the file with the given name from the directory URL into `target`.
    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()>;

    /// Uploads `source` into the directory URL under the given name.
    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()>;

    /// Deletes the file with the given name from the directory URL.
    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()>;

    /// Deletes all files in the directory URL.
    fn truncate(&self, dir_url: &str) -> Result<()>;

    /// Lists files in the directory URL.
    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>>;

    /// Looks up the file with the given name in the directory URL.
    ///
    /// Returns `None` when the file does not exist. Transfers that cannot
    /// check existence without downloading fail with [`TransferError::Unsupported`].
    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>>;

    /// Downloads the file at the URL into `target`.
    fn download(&self, file_url: &str, target: &Path) -> Result<()> {
        let (dir_url, file_name) = split_url(file_url);
        self.download_from(dir_url, file_name, target)
    }

    /// Downloads the file at the URL into `dir`, keeping its name.
    fn download_to(&self, file_url: &str, dir: &Path) -> Result<PathBuf> {
        let target = dir.join(name_from_url(file_url));
        self.download(file_url, &target)?;
        Ok(target)
    }

    /// Uploads `source` to the URL.
    fn upload(&self, file_url: &str, source: &Path) -> Result<()> {
        let (dir_url, file_name) = split_url(file_url);
        self.upload_to(dir_url, file_name, source)
    }

    /// Uploads `source` into the directory URL, keeping its name.
    fn upload_into(&self, dir_url: &str, source: &Path) -> Result<()> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TransferError::InvalidUrl {
                url: source.display().to_string(),
                reason: "source has no file name".to_string(),
            })?;
        self.upload_to(dir_url, file_name, source)
    }

    /// Deletes the file at the URL.
    fn delete(&self, file_url: &str) -> Result<()> {
        let (dir_url, file_name) = split_url(file_url);
        self.delete_from(dir_url, file_name)
    }

    /// Looks up the file at the URL.
    fn stat_url(&self, file_url: &str) -> Result<Option<FileEntry>> {
        let (dir_url, file_name) = split_url(file_url);
        self.stat(dir_url, file_name)
    }

    /// Checks if the file at the URL exists.
    fn exists(&self, file_url: &str) -> Result<bool> {
        let (dir_url, file_name) = split_url(file_url);
        self.exists_in(dir_url, file_name)
    }

    /// Checks if the file with the given name exists in the directory URL.
    fn exists_in(&self, dir_url: &str, file_name: &str) -> Result<bool> {
        Ok(self.stat(dir_url, file_name)?.is_some())
    }
}
