//! SFTP and SMB handlers.
//!
//! The wire clients live outside this crate. They plug in through
//! [`RemoteConnector`], which opens a [`RemoteSession`] per operation. The
//! handler takes care of URL parsing, credentials, progress and cleanup of
//! partial uploads.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use contract::{join_url, Credentials, FileEntry, FileTransfer, Result, TransferError};

use super::HandlerInfo;
use crate::progress::{copy_with_progress, ProgressSink, TracingProgress};
use crate::uploader::FileUploader;

/// Default remote operation timeout (60 seconds).
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// Host and path parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// URL scheme, e.g. `sftp`.
    pub scheme: String,
    /// Remote host.
    pub host: String,
    /// Port given in the URL.
    pub port: Option<u16>,
    /// Path on the remote host.
    pub path: String,
}

impl RemoteLocation {
    /// Parse a remote URL.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = ::url::Url::parse(url).map_err(|e| TransferError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TransferError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?;

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
            port: parsed.port(),
            path: parsed.path().to_string(),
        })
    }

    /// Path of a file inside this location.
    pub fn file_path(&self, file_name: &str) -> String {
        join_url(&self.path, file_name)
    }
}

/// Connection settings handed to the connector.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    /// Login credentials.
    pub credentials: Credentials,
    /// Port used when the URL does not carry one.
    pub port: Option<u16>,
    /// Timeout for establishing the session and single operations.
    pub timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            port: None,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// An open connection to a remote host.
pub trait RemoteSession {
    /// Files in a remote directory.
    fn list(&mut self, dir: &str) -> Result<Vec<FileEntry>>;

    /// Metadata of a remote file, `None` if absent.
    fn stat(&mut self, path: &str) -> Result<Option<FileEntry>>;

    /// Open a remote file for reading.
    fn read(&mut self, path: &str) -> Result<Box<dyn Read + Send>>;

    /// Create or replace a remote file for writing.
    fn write(&mut self, path: &str) -> Result<Box<dyn Write + Send>>;

    /// Remove a remote file.
    fn remove(&mut self, path: &str) -> Result<()>;
}

/// Opens sessions for a protocol.
pub trait RemoteConnector: Send + Sync {
    /// Connect to the host of `location`.
    fn connect(
        &self,
        location: &RemoteLocation,
        settings: &RemoteSettings,
    ) -> Result<Box<dyn RemoteSession>>;
}

impl<F> RemoteConnector for F
where
    F: Fn(&RemoteLocation, &RemoteSettings) -> Result<Box<dyn RemoteSession>> + Send + Sync,
{
    fn connect(
        &self,
        location: &RemoteLocation,
        settings: &RemoteSettings,
    ) -> Result<Box<dyn RemoteSession>> {
        self(location, settings)
    }
}

/// Handler for session-based remote protocols.
pub struct RemoteTransfer {
    info: HandlerInfo,
    /// Connection settings.
    pub settings: RemoteSettings,
    connector: Option<Arc<dyn RemoteConnector>>,
    progress: Arc<dyn ProgressSink>,
}

impl RemoteTransfer {
    /// Name of the SFTP handler.
    pub const SFTP: &'static str = "sftp";

    /// Name of the SMB handler.
    pub const SMB: &'static str = "smb";

    /// Handler for `sftp://` URLs.
    pub fn sftp() -> Self {
        Self::new(Self::SFTP, &["sftp://*"])
    }

    /// Handler for `smb://` URLs.
    pub fn smb() -> Self {
        Self::new(Self::SMB, &["smb://*"])
    }

    fn new(name: &str, protocols: &[&str]) -> Self {
        Self {
            info: HandlerInfo::builtin(name, protocols),
            settings: RemoteSettings::default(),
            connector: None,
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

    /// Attach the wire client.
    pub fn set_connector(&mut self, connector: Arc<dyn RemoteConnector>) {
        self.connector = Some(connector);
    }

    /// Replace the progress sink.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) {
        self.progress = progress;
    }

    fn connect(&self, dir_url: &str) -> Result<(RemoteLocation, Box<dyn RemoteSession>)> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| TransferError::ClientNotConfigured {
                protocol: self.info.name().to_string(),
            })?;
        let location = RemoteLocation::parse(dir_url)?;
        tracing::debug!(protocol = self.info.name(), host = %location.host, "Opening remote session");
        let session = connector.connect(&location, &self.settings)?;
        Ok((location, session))
    }
}

impl FileTransfer for RemoteTransfer {
    fn handles(&self, file_url: &str) -> bool {
        self.info.matches(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let (location, mut session) = self.connect(dir_url)?;
        let path = location.file_path(file_name);

        let entry = session.stat(&path)?.ok_or_else(|| {
            TransferError::protocol(
                self.info.name(),
                join_url(dir_url, file_name),
                "remote file does not exist",
            )
        })?;

        let mut input = session.read(&path)?;
        let mut output = File::create(target)?;
        copy_with_progress(
            "Downloading",
            file_name,
            entry.size().unwrap_or(0),
            &mut input,
            &mut output,
            self.progress.as_ref(),
        )?;
        Ok(())
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        let (location, mut session) = self.connect(dir_url)?;
        let path = location.file_path(file_name);

        let output = session.write(&path)?;
        let uploader = FileUploader::new(self.progress.clone());
        uploader.upload(source, output, |_| {
            if let Err(e) = session.remove(&path) {
                tracing::warn!(path = %path, error = %e, "Failed to remove partially uploaded file");
            }
        })?;

        tracing::info!(protocol = self.info.name(), url = %join_url(dir_url, file_name), "Uploaded file");
        Ok(())
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        let (location, mut session) = self.connect(dir_url)?;
        session.remove(&location.file_path(file_name))
    }

    fn truncate(&self, dir_url: &str) -> Result<()> {
        let (location, mut session) = self.connect(dir_url)?;
        for entry in session.list(&location.path)? {
            session.remove(&location.file_path(entry.name()))?;
        }
        Ok(())
    }

    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>> {
        let (location, mut session) = self.connect(dir_url)?;
        session.list(&location.path)
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        let (location, mut session) = self.connect(dir_url)?;
        session.stat(&location.file_path(file_name))
    }
}
