//! Protocol handlers and the closed set of handler kinds.
//!
//! Every handler embeds a [`HandlerInfo`] (name, protocol patterns and the
//! enabled flag) and implements [`FileTransfer`]. The manager exposes them
//! as a [`Handler`], a borrowed view over one of the known kinds.

pub mod custom;
pub mod http;
pub mod path;
pub mod remote;
pub mod resolve;
pub mod url;

use std::path::Path;

use contract::{FileEntry, FileTransfer, Result, TransferError};
use globset::{Glob, GlobSet, GlobSetBuilder};

pub use custom::CustomTransfer;
pub use http::{HttpClient, HttpTransfer};
pub use path::PathTransfer;
pub use remote::{RemoteConnector, RemoteLocation, RemoteSession, RemoteSettings, RemoteTransfer};
pub use resolve::{Coordinate, ResolveTransfer};
pub use self::url::UrlTransfer;

/// Registration data shared by every handler.
#[derive(Debug, Clone)]
pub struct HandlerInfo {
    name: String,
    protocols: Vec<String>,
    matcher: GlobSet,
    /// Disabled handlers are skipped by dispatch and name lookup.
    pub enabled: bool,
}

impl HandlerInfo {
    /// Create info for a handler with fixed, known-valid patterns.
    pub(crate) fn builtin(name: &str, protocols: &[&str]) -> Self {
        let protocols: Vec<String> = protocols.iter().map(|p| p.to_string()).collect();
        let matcher = compile(&protocols).unwrap_or_else(|e| {
            tracing::warn!(handler = name, error = %e, "Invalid built-in protocol pattern");
            GlobSet::empty()
        });
        Self {
            name: name.to_string(),
            protocols,
            matcher,
            enabled: true,
        }
    }

    /// Handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol glob patterns.
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Replace the protocol patterns.
    pub fn set_protocols<I, S>(&mut self, protocols: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let protocols: Vec<String> = protocols.into_iter().map(Into::into).collect();
        self.matcher = compile(&protocols)?;
        self.protocols = protocols;
        Ok(())
    }

    /// Whether any protocol pattern matches the URL.
    pub fn matches(&self, url: &str) -> bool {
        self.matcher.is_match(url)
    }
}

fn compile(protocols: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in protocols {
        let glob = Glob::new(pattern).map_err(|e| TransferError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| TransferError::InvalidPattern {
        pattern: protocols.join(", "),
        reason: e.to_string(),
    })
}

/// One of the known handler kinds, borrowed from the manager.
#[derive(Clone, Copy)]
pub enum Handler<'a> {
    /// `http://` and `https://` with basic auth.
    Http(&'a HttpTransfer),
    /// `sftp://` through the configured connector.
    Sftp(&'a RemoteTransfer),
    /// `smb://` through the configured connector.
    Smb(&'a RemoteTransfer),
    /// Artifact coordinates searched in repositories.
    Resolve(&'a ResolveTransfer),
    /// Any other `scheme://` URL.
    Url(&'a UrlTransfer),
    /// Local filesystem paths.
    Path(&'a PathTransfer),
    /// A handler registered with closures.
    Custom(&'a CustomTransfer),
}

impl<'a> Handler<'a> {
    /// Registration data of the handler.
    pub fn info(&self) -> &'a HandlerInfo {
        match *self {
            Handler::Http(t) => t.info(),
            Handler::Sftp(t) | Handler::Smb(t) => t.info(),
            Handler::Resolve(t) => t.info(),
            Handler::Url(t) => t.info(),
            Handler::Path(t) => t.info(),
            Handler::Custom(t) => t.info(),
        }
    }

    /// Handler name.
    pub fn name(&self) -> &'a str {
        self.info().name()
    }

    /// Whether dispatch may select this handler.
    pub fn enabled(&self) -> bool {
        self.info().enabled
    }

    /// The handler as a plain transfer.
    pub fn transfer(&self) -> &'a dyn FileTransfer {
        match *self {
            Handler::Http(t) => t,
            Handler::Sftp(t) | Handler::Smb(t) => t,
            Handler::Resolve(t) => t,
            Handler::Url(t) => t,
            Handler::Path(t) => t,
            Handler::Custom(t) => t,
        }
    }
}

impl std::fmt::Debug for Handler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("protocols", &self.info().protocols())
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl FileTransfer for Handler<'_> {
    fn handles(&self, file_url: &str) -> bool {
        self.transfer().handles(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        self.transfer().download_from(dir_url, file_name, target)
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        self.transfer().upload_to(dir_url, file_name, source)
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        self.transfer().delete_from(dir_url, file_name)
    }

    fn truncate(&self, dir_url: &str) -> Result<()> {
        self.transfer().truncate(dir_url)
    }

    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>> {
        self.transfer().list(dir_url)
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        self.transfer().stat(dir_url, file_name)
    }
}
