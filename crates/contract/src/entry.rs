//! Remote file descriptor.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Immutable descriptor of a remote file returned by stat calls and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified: Option<SystemTime>,
}

impl FileEntry {
    /// Create an entry knowing only the file name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified: None,
        }
    }

    /// Attach the size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Attach the last modification time.
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Build an entry from local filesystem metadata.
    pub fn from_metadata(name: impl Into<String>, metadata: &std::fs::Metadata) -> Self {
        let entry = Self::new(name).with_size(metadata.len());
        match metadata.modified() {
            Ok(modified) => entry.with_modified(modified),
            Err(_) => entry,
        }
    }

    /// File name, without directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Last modification time, if known.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_entry_builders() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let entry = FileEntry::new("app.zip")
            .with_size(2048)
            .with_modified(modified);

        assert_eq!(entry.name(), "app.zip");
        assert_eq!(entry.size(), Some(2048));
        assert_eq!(entry.modified(), Some(modified));
    }

    #[test]
    fn test_entry_unknown_fields() {
        let entry = FileEntry::new("app.zip");
        assert_eq!(entry.size(), None);
        assert_eq!(entry.modified(), None);
    }

    #[test]
    fn test_entry_from_metadata() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, [0u8; 42]).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let entry = FileEntry::from_metadata("data.bin", &metadata);

        assert_eq!(entry.size(), Some(42));
        assert!(entry.modified().is_some());
    }

    #[test]
    fn test_entry_json_skips_unknown_fields() {
        let json = serde_json::to_string(&FileEntry::new("a.txt").with_size(3)).unwrap();
        assert_eq!(json, r#"{"name":"a.txt","size":3}"#);

        let parsed: FileEntry = serde_json::from_str(r#"{"name":"b.txt"}"#).unwrap();
        assert_eq!(parsed, FileEntry::new("b.txt"));
    }
}
