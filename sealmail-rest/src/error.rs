//! Error types for the entity REST layer.

use sealmail_crypto::CryptoError;
use sealmail_types::{Entity, TypeError};
use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations.
pub type RestResult<T> = Result<T, RestError>;

/// Result type for entity client operations.
pub type EntityRestResult<T> = Result<T, EntityRestError>;

/// Errors raised by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum RestError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("too many requests: retry after {retry_after_secs:?}s")]
    TooManyRequests { retry_after_secs: Option<u64> },

    #[error("internal server error: {0}")]
    InternalServerError(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("connection error: {0}")]
    Connection(String),
}

impl RestError {
    /// Maps a non-success HTTP status to the matching error.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let message = message.into();
        match status {
            400 => Self::BadRequest(message),
            401 => Self::NotAuthenticated(message),
            403 => Self::NotAuthorized(message),
            404 => Self::NotFound(message),
            405 => Self::MethodNotAllowed(message),
            409 => Self::Conflict(message),
            412 => Self::PreconditionFailed(message),
            413 => Self::PayloadTooLarge(message),
            429 => Self::TooManyRequests { retry_after_secs },
            500 => Self::InternalServerError(message),
            503 => Self::ServiceUnavailable(message),
            _ => Self::Http { status, message },
        }
    }

    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, Self::PayloadTooLarge(_))
    }

    /// Returns the retry-after duration if the server asked us to back off.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TooManyRequests {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Errors raised by the [`EntityRestClient`](crate::EntityRestClient).
#[derive(Debug, Error)]
pub enum EntityRestError {
    /// The type reference is unknown or cannot be addressed.
    #[error("type resolution failed: {0}")]
    TypeResolution(#[from] TypeError),

    /// The caller violated the operation's contract.
    #[error("illegal usage: {0}")]
    Usage(String),

    /// Transport or server failure, including the authentication gate.
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server answered with a well-formed body that breaks the protocol.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    SetupMultiple(#[from] SetupMultipleError),
}

impl EntityRestError {
    /// Returns true if the server rejected the request body as too large.
    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_payload_too_large())
    }
}

/// Aggregate failure of a bulk create.
///
/// `errors` and `failed_instances` are not index-aligned: a chunk that
/// failed as a whole contributes one error and all of its instances.
#[derive(Debug, Error)]
#[error("setup multiple entities failed: {} error(s), {} instance(s) not created", .errors.len(), .failed_instances.len())]
pub struct SetupMultipleError {
    pub errors: Vec<EntityRestError>,
    pub failed_instances: Vec<Entity>,
}
