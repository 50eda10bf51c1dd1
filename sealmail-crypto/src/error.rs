//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The instance names no owner group, or its key is unknown.
    #[error("no usable owner group for instance: {0}")]
    MissingOwnerGroup(String),

    /// Encrypted values were present but no session key was supplied.
    #[error("session key required to encrypt field {0}")]
    MissingSessionKey(String),

    /// A wire field had the wrong JSON shape.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// A registered migration rejected the instance.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
