//! Transfer manager: handler registry, dispatch and the idempotent transfer
//! protocols.
//!
//! The manager owns one instance of every built-in handler plus any number of
//! custom handlers. Configuration happens through `&mut self` before the
//! manager is shared; transfers only need `&self`, so a configured manager
//! can be wrapped in an `Arc` and used from parallel workers.
//!
//! Downloads are atomic: data lands in `<target>.tmp` and is renamed into
//! place on success. An existing target is never downloaded again. Uploads
//! check the destination first and are skipped when the file is present.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contract::{
    join_url, name_from_url, split_url, Credentials, FileEntry, FileTransfer, Result,
    TransferError,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::handlers::{
    CustomTransfer, Handler, HttpTransfer, PathTransfer, RemoteTransfer, ResolveTransfer,
    UrlTransfer,
};
use crate::progress::ProgressSink;

/// Suffix of the scratch file written during a download.
pub const TMP_SUFFIX: &str = ".tmp";

/// Registry of transfer handlers and entry point for all transfers.
pub struct TransferManager {
    http: HttpTransfer,
    sftp: RemoteTransfer,
    smb: RemoteTransfer,
    resolve: ResolveTransfer,
    url: UrlTransfer,
    path: PathTransfer,
    custom: Vec<CustomTransfer>,
    credentials: Credentials,
    temp_dir: PathBuf,
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl TransferManager {
    /// Build the manager and all built-in handlers from configuration.
    pub fn new(config: &Config) -> Self {
        let mut http = HttpTransfer::new();
        http.client.connect_timeout = config.http.connect_timeout();
        http.client.request_timeout = config.http.request_timeout();

        let mut url = UrlTransfer::new();
        url.client.connect_timeout = config.http.connect_timeout();
        url.client.request_timeout = config.http.request_timeout();

        let mut resolve = ResolveTransfer::new();
        resolve.repositories = config.resolve.repositories.clone();
        resolve.client = url.client.clone();

        let mut sftp = RemoteTransfer::sftp();
        sftp.settings.timeout = config.remote.timeout();
        let mut smb = RemoteTransfer::smb();
        smb.settings.timeout = config.remote.timeout();

        let mut manager = Self {
            http,
            sftp,
            smb,
            resolve,
            url,
            path: PathTransfer::new(),
            custom: Vec::new(),
            credentials: Credentials::default(),
            temp_dir: config.general.temp_dir.clone(),
        };
        manager.set_credentials(
            config.transfer.user.clone(),
            config.transfer.password.clone(),
            config.transfer.domain.clone(),
        );
        manager
    }

    /// Scratch directory used by [`download_to_temp`](Self::download_to_temp).
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Configure the HTTP handler.
    pub fn http(&mut self, configure: impl FnOnce(&mut HttpTransfer)) -> &mut Self {
        configure(&mut self.http);
        self
    }

    /// Configure the SFTP handler.
    pub fn sftp(&mut self, configure: impl FnOnce(&mut RemoteTransfer)) -> &mut Self {
        configure(&mut self.sftp);
        self
    }

    /// Configure the SMB handler.
    pub fn smb(&mut self, configure: impl FnOnce(&mut RemoteTransfer)) -> &mut Self {
        configure(&mut self.smb);
        self
    }

    /// Configure the artifact resolution handler.
    pub fn resolve(&mut self, configure: impl FnOnce(&mut ResolveTransfer)) -> &mut Self {
        configure(&mut self.resolve);
        self
    }

    /// Configure the generic URL handler.
    pub fn url(&mut self, configure: impl FnOnce(&mut UrlTransfer)) -> &mut Self {
        configure(&mut self.url);
        self
    }

    /// Configure the local path handler.
    pub fn path(&mut self, configure: impl FnOnce(&mut PathTransfer)) -> &mut Self {
        configure(&mut self.path);
        self
    }

    /// Register a custom handler matching `<name>://*`.
    ///
    /// Custom handlers are consulted before the built-ins, in registration
    /// order.
    pub fn custom(
        &mut self,
        name: impl Into<String>,
        configure: impl FnOnce(&mut CustomTransfer),
    ) -> &mut Self {
        let mut transfer = CustomTransfer::new(name);
        configure(&mut transfer);
        debug!(handler = transfer.info().name(), "Registered custom file transfer");
        self.custom.push(transfer);
        self
    }

    /// Set credentials and copy them into the authenticating handlers.
    ///
    /// HTTP receives user and password as basic auth, SFTP user and password,
    /// SMB all three. Later changes to a handler do not flow back.
    pub fn set_credentials(
        &mut self,
        user: Option<String>,
        password: Option<String>,
        domain: Option<String>,
    ) {
        self.credentials = Credentials::new(user, password, domain);

        self.http.client.basic_user = self.credentials.user.clone();
        self.http.client.basic_password = self.credentials.password.clone();
        self.sftp.settings.credentials = Credentials::new(
            self.credentials.user.clone(),
            self.credentials.password.clone(),
            None,
        );
        self.smb.settings.credentials = self.credentials.clone();
    }

    /// User and password, failing when either is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        self.credentials.pair()
    }

    /// Credentials rendered as `user:password`.
    pub fn credentials_string(&self) -> Result<String> {
        let (user, password) = self.credentials()?;
        Ok(format!("{}:{}", user, password))
    }

    /// Use the sink for progress reporting of every built-in handler.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) {
        self.http.set_progress(progress.clone());
        self.sftp.set_progress(progress.clone());
        self.smb.set_progress(progress.clone());
        self.resolve.set_progress(progress.clone());
        self.url.set_progress(progress.clone());
        self.path.set_progress(progress);
    }

    /// Enabled handlers in dispatch order: custom handlers first, then http,
    /// sftp, smb, resolve, url and path.
    pub fn handlers(&self) -> impl Iterator<Item = Handler<'_>> {
        let builtin = [
            Handler::Http(&self.http),
            Handler::Sftp(&self.sftp),
            Handler::Smb(&self.smb),
            Handler::Resolve(&self.resolve),
            Handler::Url(&self.url),
            Handler::Path(&self.path),
        ];
        self.custom
            .iter()
            .map(Handler::Custom)
            .chain(builtin)
            .filter(|handler| handler.enabled())
    }

    /// First enabled handler accepting the URL.
    pub fn handling(&self, url: &str) -> Result<Handler<'_>> {
        match self.handlers().find(|handler| handler.handles(url)) {
            Some(handler) => {
                debug!(url = %url, handler = handler.name(), "Selected file transfer");
                Ok(handler)
            }
            None => Err(TransferError::HandlerNotFound {
                url: url.to_string(),
            }),
        }
    }

    /// Enabled handler with the exact name.
    pub fn named(&self, name: &str) -> Result<Handler<'_>> {
        self.handlers()
            .find(|handler| handler.name() == name)
            .ok_or_else(|| TransferError::NamedHandlerNotFound {
                name: name.to_string(),
            })
    }

    /// Download into the scratch directory, keeping the remote file name.
    pub fn download_to_temp(&self, file_url: &str) -> Result<PathBuf> {
        let file_name = name_from_url(file_url);
        require_file_name(file_url, file_name)?;
        let target = self.temp_dir.join(file_name);
        self.download(file_url, &target)?;
        Ok(target)
    }

    /// Download through the given handler, bypassing dispatch.
    pub fn download_using(
        &self,
        transfer: &dyn FileTransfer,
        file_url: &str,
        target: &Path,
    ) -> Result<()> {
        let (dir_url, file_name) = split_url(file_url);
        self.download_from_using(transfer, dir_url, file_name, target)
    }

    /// Atomic, idempotent download through the given handler.
    pub fn download_from_using(
        &self,
        transfer: &dyn FileTransfer,
        dir_url: &str,
        file_name: &str,
        target: &Path,
    ) -> Result<()> {
        require_file_name(&join_url(dir_url, file_name), file_name)?;
        if target.exists() {
            info!(path = ?target, "File already exists, skipping download");
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = temp_path(target);
        if temp.exists() {
            debug!(path = ?temp, "Removing stale temporary file");
            fs::remove_file(&temp)?;
        }

        // A failed download leaves the temporary file behind
        transfer.download_from(dir_url, file_name, &temp)?;
        fs::rename(&temp, target)?;

        info!(url = %join_url(dir_url, file_name), path = ?target, "Downloaded file");
        Ok(())
    }

    /// Upload through the given handler, bypassing dispatch.
    pub fn upload_using(
        &self,
        transfer: &dyn FileTransfer,
        file_url: &str,
        source: &Path,
    ) -> Result<()> {
        let (dir_url, file_name) = split_url(file_url);
        self.upload_to_using(transfer, dir_url, file_name, source)
    }

    /// Idempotent upload through the given handler.
    pub fn upload_to_using(
        &self,
        transfer: &dyn FileTransfer,
        dir_url: &str,
        file_name: &str,
        source: &Path,
    ) -> Result<()> {
        let url = join_url(dir_url, file_name);
        match transfer.stat(dir_url, file_name) {
            Ok(Some(_)) => {
                info!(url = %url, "File already exists, skipping upload");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => debug!(url = %url, error = %e, "Existence check failed, uploading anyway"),
        }

        transfer.upload_to(dir_url, file_name, source)?;
        info!(url = %url, source = ?source, "Uploaded file");
        Ok(())
    }
}

/// A URL ending in `/` names a directory, not a file.
fn require_file_name(url: &str, file_name: &str) -> Result<()> {
    if file_name.is_empty() {
        return Err(TransferError::InvalidUrl {
            url: url.to_string(),
            reason: "missing file name".to_string(),
        });
    }
    Ok(())
}

/// Sibling of `target` named `<name>.tmp`.
fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    target.with_file_name(name)
}

impl std::fmt::Debug for TransferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers: Vec<&str> = self.handlers().map(|handler| handler.name()).collect();
        f.debug_struct("TransferManager")
            .field("handlers", &handlers)
            .field("credentials", &self.credentials)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl FileTransfer for TransferManager {
    fn handles(&self, file_url: &str) -> bool {
        self.handlers().any(|handler| handler.handles(file_url))
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let handler = self.handling(&join_url(dir_url, file_name))?;
        self.download_from_using(&handler, dir_url, file_name, target)
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        let handler = self.handling(&join_url(dir_url, file_name))?;
        self.upload_to_using(&handler, dir_url, file_name, source)
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        self.handling(&join_url(dir_url, file_name))?
            .delete_from(dir_url, file_name)
    }

    fn truncate(&self, dir_url: &str) -> Result<()> {
        self.handling(dir_url)?.truncate(dir_url)
    }

    fn list(&self, dir_url: &str) -> Result<Vec<FileEntry>> {
        self.handling(dir_url)?.list(dir_url)
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        self.handling(&join_url(dir_url, file_name))?
            .stat(dir_url, file_name)
    }
}
