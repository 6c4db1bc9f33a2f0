//! Error types for trove

use thiserror::Error;

/// Error types for trove operations
#[derive(Debug, Error)]
pub enum TroveError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No `.trove.yml` in the starting directory or any ancestor
    #[error("Config not found")]
    ConfigNotFound,

    /// Manifest is empty or not a mapping
    #[error("Empty config")]
    EmptyConfig,

    /// Manifest is not valid YAML or has badly typed fields
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Neither the manifest nor the environment names a storage URL
    #[error("Missing storage")]
    MissingStorage,

    /// Storage value is not a URL with a scheme
    #[error("Invalid storage")]
    InvalidStorageUrl,

    /// Storage URL scheme has no registered backend
    #[error("Invalid storage provider: {0}")]
    InvalidStorageProvider(String),

    /// Push source is missing from the working tree
    #[error("File not found: {0}")]
    LocalFileNotFound(String),

    /// Pull target (or requested version) is missing from storage
    #[error("File not found: {0}")]
    RemoteFileNotFound(String),

    /// File name that would resolve outside the root directory
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Transport, auth or protocol failure reported by the backend
    #[error("Storage error: {0}")]
    Backend(String),

    /// Invalid combination of arguments
    #[error("{0}")]
    Argument(String),
}

impl TroveError {
    /// Check if this error comes from manifest or storage URL resolution
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TroveError::ConfigNotFound
                | TroveError::EmptyConfig
                | TroveError::InvalidConfig(_)
                | TroveError::MissingStorage
                | TroveError::InvalidStorageUrl
                | TroveError::InvalidStorageProvider(_)
        )
    }

    /// Check if this error means a local or remote file is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TroveError::LocalFileNotFound(_) | TroveError::RemoteFileNotFound(_)
        )
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, TroveError>;
