//! Error types for the storage core.

use std::path::PathBuf;

use crate::crypto::CryptoError;

/// Errors that can occur when working with the blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob not found on read/merge
    #[error("blob not found: {0}")]
    NotFound(PathBuf),

    /// Envelope encryption/decryption error
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
