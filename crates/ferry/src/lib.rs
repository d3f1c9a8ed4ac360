//! # Ferry
//!
//! Multi-protocol file transfer facade. One manager hides which protocol
//! serves a URL and makes transfers safe to repeat.
//!
//! ## Overview
//!
//! - **Dispatch**: the first enabled handler accepting a URL serves it.
//!   Custom handlers are consulted before the built-ins.
//! - **Atomic downloads**: data is written to `<target>.tmp` and renamed into
//!   place, so a target is either absent or complete.
//! - **Idempotency**: existing targets are not downloaded again, and present
//!   remote files are not uploaded again.
//! - **Fan-out**: [`Parallel`] runs blocking transfers on a shared or a
//!   dedicated, named thread pool.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      TransferManager                         │
//! │   credentials ─► http / sftp / smb     download / upload     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ custom… │ http │ sftp │ smb │ resolve │ url │ path           │
//! └──────────────────────────────────────────────────────────────┘
//!          ▲
//!          │ Arc<TransferManager>
//! ┌────────┴─────────────────────────────────────────────────────┐
//! │                 Parallel (spawn_blocking workers)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use ferry::{Config, FileTransfer, Parallel, TransferManager};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let mut manager = TransferManager::new(&config);
//!     manager.custom("mem", |h| {
//!         h.on_download(|_, _, target| Ok(std::fs::write(target, b"hello")?));
//!     });
//!
//!     let manager = Arc::new(manager);
//!     let urls = vec!["mem://bucket/a.txt", "mem://bucket/b.txt"];
//!     Parallel::each(urls, move |url| {
//!         manager.download_to(url, Path::new("/tmp/out")).map(|_| ())
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`handlers`]: Protocol handlers and the handler sum type
//! - [`manager`]: Registry, dispatch and the idempotent transfer protocols
//! - [`parallel`]: Fan-out engine
//! - [`progress`]: Progress reporting and chunked copies
//! - [`uploader`]: Streaming upload with cleanup on failure

pub mod config;
pub mod handlers;
pub mod manager;
pub mod parallel;
pub mod progress;
pub mod uploader;

// Re-export the contract for convenience
pub use contract;
pub use contract::{Credentials, FileEntry, FileTransfer, TransferError};

// Re-export config types for convenience
pub use config::{Config, ConfigError};

// Re-export handler types for convenience
pub use handlers::{
    Coordinate, CustomTransfer, Handler, HandlerInfo, HttpClient, HttpTransfer, PathTransfer,
    RemoteConnector, RemoteLocation, RemoteSession, RemoteSettings, RemoteTransfer,
    ResolveTransfer, UrlTransfer,
};

// Re-export manager types for convenience
pub use manager::{TransferManager, TMP_SUFFIX};

// Re-export parallel types for convenience
pub use parallel::{Parallel, ParallelError, Pool};

// Re-export progress types for convenience
pub use progress::{ProgressSink, TracingProgress};

pub use uploader::FileUploader;
