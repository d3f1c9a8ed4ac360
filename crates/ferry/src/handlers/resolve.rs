//! Artifact coordinate handler.
//!
//! Resolves `group:artifact:version[:classifier][@extension]` against an
//! ordered list of Maven-layout repositories. Bare coordinates are always
//! accepted. Registered patterns add URL forms such as `mvn://<coordinate>`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contract::{join_url, FileEntry, FileTransfer, Result, TransferError};

use super::{HandlerInfo, HttpClient};
use crate::progress::{copy_with_progress, ProgressSink, TracingProgress};

/// Default repository.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

/// Extension used when a coordinate names none.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Parsed artifact coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    /// Dotted group id, e.g. `org.acme`.
    pub group: String,
    /// Artifact id.
    pub artifact: String,
    /// Version string.
    pub version: String,
    /// Optional classifier, e.g. `sources`.
    pub classifier: Option<String>,
    /// File extension, `jar` unless given after `@`.
    pub extension: String,
}

impl Coordinate {
    /// Parse a coordinate, `None` if the text is not one.
    pub fn parse(notation: &str) -> Option<Self> {
        if notation.contains("://") || notation.contains(['/', '\\']) {
            return None;
        }

        let (coords, extension) = match notation.split_once('@') {
            Some((coords, ext)) => (coords, ext),
            None => (notation, DEFAULT_EXTENSION),
        };
        if extension.is_empty() {
            return None;
        }

        let parts: Vec<&str> = coords.split(':').collect();
        if !(3..=4).contains(&parts.len())
            || parts
                .iter()
                .any(|part| part.is_empty() || part.contains(char::is_whitespace))
        {
            return None;
        }

        Some(Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier: parts.get(3).map(|c| c.to_string()),
            extension: extension.to_string(),
        })
    }

    /// File name inside the repository.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Path relative to a repository root, `/` separated.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }
}

/// Handler for artifact coordinates.
pub struct ResolveTransfer {
    info: HandlerInfo,
    /// Repositories searched in order. `http(s)://` roots are fetched over
    /// HTTP, `file://` URLs and plain paths are read from disk.
    pub repositories: Vec<String>,
    /// Request settings for HTTP repositories.
    pub client: HttpClient,
    progress: Arc<dyn ProgressSink>,
}

impl Default for ResolveTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolveTransfer {
    /// Handler name.
    pub const NAME: &'static str = "resolve";

    /// Create the handler searching Maven Central.
    pub fn new() -> Self {
        Self {
            info: HandlerInfo::builtin(Self::NAME, &[]),
            repositories: vec![MAVEN_CENTRAL.to_string()],
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

    fn fetch_from(&self, repository: &str, coordinate: &Coordinate, target: &Path) -> Result<bool> {
        if repository.starts_with("http://") || repository.starts_with("https://") {
            let url = join_url(repository, &coordinate.repository_path());
            return self.client.fetch(&url, target, self.progress.as_ref());
        }

        let source = local_repository(repository)?.join(coordinate.repository_path());
        if !source.is_file() {
            return Ok(false);
        }
        let mut input = File::open(&source)?;
        let total = input.metadata()?.len();
        let mut output = File::create(target)?;
        copy_with_progress(
            "Resolving",
            &coordinate.file_name(),
            total,
            &mut input,
            &mut output,
            self.progress.as_ref(),
        )?;
        Ok(true)
    }
}

fn local_repository(repository: &str) -> Result<PathBuf> {
    if repository.starts_with("file:") {
        let url = ::url::Url::parse(repository).map_err(|e| TransferError::InvalidUrl {
            url: repository.to_string(),
            reason: e.to_string(),
        })?;
        return url.to_file_path().map_err(|_| TransferError::InvalidUrl {
            url: repository.to_string(),
            reason: "not a local file URL".to_string(),
        });
    }
    Ok(PathBuf::from(repository))
}

/// `mvn://org.acme:app:1.0` names the coordinate `org.acme:app:1.0`.
fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map_or(url, |(_, rest)| rest)
}

impl FileTransfer for ResolveTransfer {
    fn handles(&self, file_url: &str) -> bool {
        self.info.matches(file_url) || Coordinate::parse(file_url).is_some()
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let notation = join_url(dir_url, file_name);
        let coordinate = Coordinate::parse(strip_scheme(&notation)).ok_or_else(|| TransferError::InvalidUrl {
            url: notation.clone(),
            reason: "expected group:artifact:version[:classifier][@extension]".to_string(),
        })?;

        for repository in &self.repositories {
            if self.fetch_from(repository, &coordinate, target)? {
                tracing::debug!(notation = %notation, repository = %repository, "Resolved artifact");
                return Ok(());
            }
            tracing::debug!(notation = %notation, repository = %repository, "Artifact not in repository");
        }

        Err(TransferError::ArtifactNotFound {
            notation,
            repositories: self.repositories.len(),
        })
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

    fn stat(&self, _dir_url: &str, _file_name: &str) -> Result<Option<FileEntry>> {
        Err(TransferError::unsupported(Self::NAME, "stat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn publish(repo: &Path, relative: &str, content: &[u8]) {
        let path = repo.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_coordinate() {
        let c = Coordinate::parse("com.example:tools:1.2.0").unwrap();
        assert_eq!(c.group, "com.example");
        assert_eq!(c.artifact, "tools");
        assert_eq!(c.version, "1.2.0");
        assert_eq!(c.classifier, None);
        assert_eq!(c.extension, "jar");
        assert_eq!(c.repository_path(), "com/example/tools/1.2.0/tools-1.2.0.jar");
    }

    #[test]
    fn test_parse_coordinate_with_classifier_and_extension() {
        let c = Coordinate::parse("com.example:dist:2.0:linux@zip").unwrap();
        assert_eq!(c.classifier.as_deref(), Some("linux"));
        assert_eq!(c.extension, "zip");
        assert_eq!(c.file_name(), "dist-2.0-linux.zip");
    }

    #[test]
    fn test_parse_rejects_urls_and_paths() {
        assert!(Coordinate::parse("http://host:80/a:b:c").is_none());
        assert!(Coordinate::parse("/tmp/a:b:c").is_none());
        assert!(Coordinate::parse("C:\\builds\\a.zip").is_none());
        assert!(Coordinate::parse("a:b").is_none());
        assert!(Coordinate::parse("a::c").is_none());
        assert!(Coordinate::parse("a:b:c@").is_none());
        assert!(Coordinate::parse("a:b:c:d:e").is_none());
    }

    #[test]
    fn test_handles_coordinates_only() {
        let transfer = ResolveTransfer::new();
        assert!(transfer.handles("org.acme:app:1.0@zip"));
        assert!(!transfer.handles("https://repo/org/acme/app/1.0/app-1.0.zip"));
        assert!(!transfer.handles("app-1.0.zip"));
    }

    #[test]
    fn test_handles_registered_patterns() {
        let repo = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        publish(repo.path(), "org/acme/app/1.0/app-1.0.zip", b"app");

        let mut transfer = ResolveTransfer::new();
        transfer.repositories = vec![repo.path().display().to_string()];
        assert!(!transfer.handles("mvn://org.acme:app:1.0@zip"));

        transfer.info_mut().set_protocols(["mvn://*"]).unwrap();
        assert!(transfer.handles("mvn://org.acme:app:1.0@zip"));
        assert!(transfer.handles("org.acme:app:1.0@zip"));

        let target = out.path().join("app.zip");
        transfer.download("mvn://org.acme:app:1.0@zip", &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"app");
    }

    #[test]
    fn test_download_searches_repositories_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        publish(second.path(), "org/acme/app/1.0/app-1.0.zip", b"from second");

        let mut transfer = ResolveTransfer::new();
        transfer.repositories = vec![
            first.path().display().to_string(),
            second.path().display().to_string(),
        ];

        let target = out.path().join("app.zip");
        transfer.download("org.acme:app:1.0@zip", &target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"from second");
    }

    #[test]
    fn test_download_from_file_url_repository() {
        let repo = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        publish(repo.path(), "org/acme/lib/2.1/lib-2.1.jar", b"jar");

        let mut transfer = ResolveTransfer::new();
        transfer.repositories = vec![::url::Url::from_directory_path(repo.path())
            .unwrap()
            .to_string()];

        let target = out.path().join("lib.jar");
        transfer.download("org.acme:lib:2.1", &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"jar");
    }

    #[test]
    fn test_download_not_found() {
        let repo = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let mut transfer = ResolveTransfer::new();
        transfer.repositories = vec![repo.path().display().to_string()];

        let result = transfer.download("org.acme:missing:1.0", &out.path().join("m.jar"));
        assert!(matches!(
            result,
            Err(TransferError::ArtifactNotFound { repositories: 1, .. })
        ));
    }

    #[test]
    fn test_other_operations_unsupported() {
        let transfer = ResolveTransfer::new();
        assert!(transfer.stat("", "a:b:c").unwrap_err().is_unsupported());
        assert!(transfer.list("").unwrap_err().is_unsupported());
    }
}
