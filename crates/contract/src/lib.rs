//! # Ferry Contract Library
//!
//! This crate defines the contract shared by every Ferry protocol handler
//! and by the transfer manager that dispatches between them.
//!
//! ## Overview
//!
//! - **Transfer Contract**: the [`FileTransfer`] trait with its raw primitives
//!   (download, upload, delete, truncate, list, stat) and the URL-based
//!   conveniences derived from them
//! - **File Entries**: immutable [`FileEntry`] descriptors returned by stat calls
//!   and listings
//! - **Credentials**: the optional user/password/domain triple handed to
//!   handlers that authenticate
//! - **Errors**: the [`TransferError`] taxonomy used across the workspace
//!
//! ## Example Usage
//!
//! ```rust
//! use contract::{join_url, split_url};
//!
//! let (dir, name) = split_url("sftp://host/releases/app-1.0.zip");
//! assert_eq!(dir, "sftp://host/releases");
//! assert_eq!(name, "app-1.0.zip");
//! assert_eq!(join_url(dir, name), "sftp://host/releases/app-1.0.zip");
//! ```
//!
//! ## Modules
//!
//! - [`transfer`]: the transfer trait and URL helpers
//! - [`entry`]: file entry descriptor
//! - [`credentials`]: credential triple
//! - [`error`]: error types

pub mod credentials;
pub mod entry;
pub mod error;
pub mod transfer;

pub use credentials::Credentials;
pub use entry::FileEntry;
pub use error::{Result, TransferError};
pub use transfer::{join_url, name_from_url, split_url, FileTransfer, URL_DELIMITER};
