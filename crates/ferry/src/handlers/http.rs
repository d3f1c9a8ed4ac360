//! HTTP(S) handler built on a blocking reqwest client.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contract::{join_url, FileEntry, FileTransfer, Result, TransferError};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Method, StatusCode};

use super::HandlerInfo;
use crate::progress::{copy_with_progress, ProgressSink, TracingProgress};

/// Default connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request timeout (5 minutes).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for outgoing HTTP requests.
#[derive(Clone)]
pub struct HttpClient {
    /// Basic auth user.
    pub basic_user: Option<String>,
    /// Basic auth password.
    pub basic_password: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole request timeout.
    pub request_timeout: Duration,
    /// Client built for the timeouts it was created with. Shared by clones.
    cache: Arc<Mutex<Option<CachedClient>>>,
}

struct CachedClient {
    connect_timeout: Duration,
    request_timeout: Duration,
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            basic_user: None,
            basic_password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache: Arc::default(),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("basic_user", &self.basic_user)
            .field("basic_password", &self.basic_password.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HttpClient {
    /// Reuse the pooled client, rebuilding it only when a timeout changed.
    fn client(&self, url: &str) -> Result<Client> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.as_ref() {
            if cached.connect_timeout == self.connect_timeout
                && cached.request_timeout == self.request_timeout
            {
                return Ok(cached.client.clone());
            }
        }

        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| TransferError::protocol("http", url, e))?;
        tracing::debug!(
            connect_timeout = ?self.connect_timeout,
            request_timeout = ?self.request_timeout,
            "Built HTTP client"
        );
        *cache = Some(CachedClient {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            client: client.clone(),
        });
        Ok(client)
    }

    #[cfg(test)]
    fn cached_timeouts(&self) -> Option<(Duration, Duration)> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .map(|cached| (cached.connect_timeout, cached.request_timeout))
    }

    /// Start a request, attaching basic auth when a user is set.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let builder = self.client(url)?.request(method, url);
        Ok(match &self.basic_user {
            Some(user) => builder.basic_auth(user, self.basic_password.as_ref()),
            None => builder,
        })
    }

    fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        builder
            .send()
            .map_err(|e| TransferError::protocol("http", url, e))
    }

    /// GET `url` into `target`.
    ///
    /// Returns `false` without touching `target` when the server answers 404.
    pub fn fetch(&self, url: &str, target: &Path, progress: &dyn ProgressSink) -> Result<bool> {
        let response = self.send(self.request(Method::GET, url)?, url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let mut response = response
            .error_for_status()
            .map_err(|e| TransferError::protocol("http", url, e))?;

        let total = response.content_length().unwrap_or(0);
        let name = contract::name_from_url(url);
        let mut file = File::create(target)?;
        copy_with_progress("Downloading", name, total, &mut response, &mut file, progress)?;

        tracing::debug!(url, path = ?target, "HTTP download complete");
        Ok(true)
    }
}

/// Handler for `http://` and `https://` URLs.
pub struct HttpTransfer {
    info: HandlerInfo,
    /// Request settings, including basic auth credentials.
    pub client: HttpClient,
    progress: Arc<dyn ProgressSink>,
}

impl Default for HttpTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransfer {
    /// Handler name.
    pub const NAME: &'static str = "http";

    /// Create the handler with default settings.
    pub fn new() -> Self {
        Self {
            info: HandlerInfo::builtin(Self::NAME, &["http://*", "https://*"]),
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
}

impl FileTransfer for HttpTransfer {
    fn handles(&self, file_url: &str) -> bool {
        self.info.matches(file_url)
    }

    fn download_from(&self, dir_url: &str, file_name: &str, target: &Path) -> Result<()> {
        let url = join_url(dir_url, file_name);
        if self.client.fetch(&url, target, self.progress.as_ref())? {
            Ok(())
        } else {
            Err(TransferError::protocol(
                Self::NAME,
                url,
                "server responded 404 Not Found",
            ))
        }
    }

    fn upload_to(&self, dir_url: &str, file_name: &str, source: &Path) -> Result<()> {
        let url = join_url(dir_url, file_name);
        let file = File::open(source)?;
        let length = file.metadata()?.len();

        let builder = self
            .client
            .request(Method::PUT, &url)?
            .body(Body::sized(file, length));
        self.client
            .send(builder, &url)?
            .error_for_status()
            .map_err(|e| TransferError::protocol(Self::NAME, &url, e))?;

        tracing::info!(url = %url, bytes = length, "Uploaded file over HTTP");
        Ok(())
    }

    fn delete_from(&self, dir_url: &str, file_name: &str) -> Result<()> {
        let url = join_url(dir_url, file_name);
        let builder = self.client.request(Method::DELETE, &url)?;
        self.client
            .send(builder, &url)?
            .error_for_status()
            .map_err(|e| TransferError::protocol(Self::NAME, &url, e))?;
        Ok(())
    }

    fn truncate(&self, _dir_url: &str) -> Result<()> {
        Err(TransferError::unsupported(Self::NAME, "truncate"))
    }

    fn list(&self, _dir_url: &str) -> Result<Vec<FileEntry>> {
        Err(TransferError::unsupported(Self::NAME, "list"))
    }

    fn stat(&self, dir_url: &str, file_name: &str) -> Result<Option<FileEntry>> {
        let url = join_url(dir_url, file_name);
        let response = self
            .client
            .send(self.client.request(Method::HEAD, &url)?, &url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| TransferError::protocol(Self::NAME, &url, e))?;

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let entry = FileEntry::new(file_name);
        Ok(Some(match size {
            Some(size) => entry.with_size(size),
            None => entry,
        }))
    }
}
