//! Error types for the contract crate.

use thiserror::Error;

/// Boxed cause carried by protocol failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Transfer error type covering all failure modes of handlers and the manager.
#[derive(Debug, Error)]
pub enum TransferError {
    // Dispatch errors
    /// No enabled handler accepts the URL.
    #[error("file transfer supporting URL '{url}' not found")]
    HandlerNotFound {
        /// The URL nobody handles.
        url: String,
    },

    /// No enabled handler carries the requested name.
    #[error("file transfer named '{name}' not found")]
    NamedHandlerNotFound {
        /// The requested handler name.
        name: String,
    },

    // Credential errors
    /// User or password is not set.
    #[error("file transfer credentials are missing")]
    CredentialsMissing,

    // Handler errors
    /// Transport-level failure reported by a protocol handler.
    #[error("{protocol} transfer failed for URL '{url}': {source}")]
    Protocol {
        /// Name of the failing handler.
        protocol: String,
        /// Remote URL being accessed.
        url: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The handler cannot perform the requested operation.
    #[error("file transfer '{handler}' does not support operation '{operation}'")]
    Unsupported {
        /// Name of the handler.
        handler: String,
        /// Name of the operation.
        operation: &'static str,
    },

    /// A handler that relies on an external wire client has none attached.
    #[error("no {protocol} client configured")]
    ClientNotConfigured {
        /// Protocol lacking a client.
        protocol: String,
    },

    /// Artifact coordinate could not be found in any repository.
    #[error("artifact '{notation}' not found in {repositories} repositories")]
    ArtifactNotFound {
        /// Artifact coordinate as given by the caller.
        notation: String,
        /// Number of repositories searched.
        repositories: usize,
    },

    /// URL could not be interpreted.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Protocol pattern could not be compiled.
    #[error("invalid protocol pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Offending glob pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

impl TransferError {
    /// Build a protocol error from any error type.
    pub fn protocol<E>(protocol: impl Into<String>, url: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        TransferError::Protocol {
            protocol: protocol.into(),
            url: url.into(),
            source: source.into(),
        }
    }

    /// Build an unsupported-operation error.
    pub fn unsupported(handler: impl Into<String>, operation: &'static str) -> Self {
        TransferError::Unsupported {
            handler: handler.into(),
            operation,
        }
    }

    /// Whether this error is a failed handler lookup.
    pub fn is_handler_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::HandlerNotFound { .. } | TransferError::NamedHandlerNotFound { .. }
        )
    }

    /// Whether this error signals an unsupported operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TransferError::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransferError::HandlerNotFound {
            url: "ftp://host/file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "file transfer supporting URL 'ftp://host/file' not found"
        );

        let err = TransferError::unsupported("http", "list");
        assert_eq!(
            err.to_string(),
            "file transfer 'http' does not support operation 'list'"
        );
    }

    #[test]
    fn test_protocol_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = TransferError::protocol("sftp", "sftp://host/dir/a.zip", cause);

        let msg = err.to_string();
        assert!(msg.contains("sftp"));
        assert!(msg.contains("sftp://host/dir/a.zip"));
        assert!(msg.contains("refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_kind_helpers() {
        assert!(TransferError::HandlerNotFound { url: "x".into() }.is_handler_not_found());
        assert!(TransferError::NamedHandlerNotFound { name: "x".into() }.is_handler_not_found());
        assert!(!TransferError::CredentialsMissing.is_handler_not_found());
        assert!(TransferError::unsupported("url", "stat").is_unsupported());
        assert!(!TransferError::CredentialsMissing.is_unsupported());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TransferError = io_err.into();
        assert!(matches!(err, TransferError::Io(_)));
    }
}
