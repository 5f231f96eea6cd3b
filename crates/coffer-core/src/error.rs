//! Error types for Coffer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Coffer.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested file does not exist under the storage root.
    #[error("File not found: {name}")]
    FileNotFound {
        /// The requested file name.
        name: String,
    },

    /// A file name was rejected before touching the filesystem.
    #[error("Invalid file name {name:?}: {reason}")]
    InvalidFileName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Upload body uses a content type the file endpoint does not accept.
    #[error("Unsupported content type: {content_type}")]
    UnsupportedMediaType {
        /// The offending `Content-Type` value.
        content_type: String,
    },

    /// Upload body exceeded the configured limit.
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The item mapping on disk could not be parsed.
    #[error("Corrupt item store at {}: {reason}", .path.display())]
    CorruptItemStore {
        /// Path of the mapping file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The item mapping path exists but could not be read.
    #[error("Unreadable item store at {}: {reason}", .path.display())]
    UnreadableItemStore {
        /// Path of the mapping file.
        path: PathBuf,
        /// I/O error message.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error means the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns `true` if this error was caused by the client's request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::InvalidFileName { .. }
                | Self::UnsupportedMediaType { .. }
                | Self::PayloadTooLarge { .. }
        )
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a file-not-found error.
    #[must_use]
    pub fn file_not_found(name: impl Into<String>) -> Self {
        Self::FileNotFound { name: name.into() }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
