//! Domain error types
//!
//! This module defines the error hierarchy for AzLearn. Service failures are
//! carried by [`RequestError`], which keeps the HTTP status and the request
//! charge of the failed call so callers can report what a failure cost.
//! No third-party error types leak through these variants.

use thiserror::Error;

/// Main AzLearn error type
#[derive(Debug, Error)]
pub enum AzLearnError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A service request failed
    #[error("{0}")]
    Request(#[from] RequestError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Every configured credential failed to produce a token
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The process-wide shutdown signal fired while a call was in flight
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl AzLearnError {
    /// Returns the request error kind, if this is a service failure
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AzLearnError::Request(e) => Some(e.kind),
            _ => None,
        }
    }

    /// True if the service reported the entity as absent
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    /// True if the service rejected a duplicate or an overwrite
    pub fn is_conflict(&self) -> bool {
        self.kind() == Some(ErrorKind::Conflict)
    }

    /// True for throttling and server-side faults
    pub fn is_transient(&self) -> bool {
        self.kind() == Some(ErrorKind::Transient)
    }

    /// Request charge attached to a failed service call
    pub fn request_charge(&self) -> Option<f64> {
        match self {
            AzLearnError::Request(e) => e.request_charge,
            _ => None,
        }
    }

    /// Shorthand for a `NotFound` request error
    pub fn not_found(message: impl Into<String>) -> Self {
        RequestError::new(ErrorKind::NotFound, message).into()
    }

    /// Shorthand for a `Conflict` request error
    pub fn conflict(message: impl Into<String>) -> Self {
        RequestError::new(ErrorKind::Conflict, message).into()
    }

    /// Shorthand for a `PreconditionFailed` request error
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        RequestError::new(ErrorKind::PreconditionFailed, message).into()
    }
}

/// Classification of a failed service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity absent (404)
    NotFound,
    /// Duplicate create or rejected overwrite (409)
    Conflict,
    /// Patch target path missing or precondition header failed (412)
    PreconditionFailed,
    /// Throttling or server-side fault (429, 5xx)
    Transient,
    /// Credential rejected (401, 403)
    Auth,
    /// Malformed request (other 4xx)
    BadRequest,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Maps an HTTP status code onto an error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            401 | 403 => ErrorKind::Auth,
            429 | 500 | 502 | 503 | 504 => ErrorKind::Transient,
            400..=499 => ErrorKind::BadRequest,
            _ => ErrorKind::Other,
        }
    }

    /// Canonical status code for this kind
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::Transient => 503,
            ErrorKind::Auth => 401,
            ErrorKind::BadRequest => 400,
            ErrorKind::Other => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::Transient => "Transient",
            ErrorKind::Auth => "Auth",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

/// A failed service request
#[derive(Debug, Clone, Error)]
#[error("{kind} ({status}): {message}")]
pub struct RequestError {
    /// Failure classification
    pub kind: ErrorKind,

    /// HTTP status code reported by the service
    pub status: u16,

    /// Error message
    pub message: String,

    /// Request charge billed for the failed call, when the service reports one
    pub request_charge: Option<f64>,
}

impl RequestError {
    /// Creates a request error with the canonical status for `kind`
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.status(),
            message: message.into(),
            request_charge: None,
        }
    }

    /// Creates a request error from a raw HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            status,
            message: message.into(),
            request_charge: None,
        }
    }

    /// Attaches the request charge of the failed call
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.request_charge = Some(charge);
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for AzLearnError {
    fn from(err: std::io::Error) -> Self {
        AzLearnError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AzLearnError {
    fn from(err: serde_json::Error) -> Self {
        AzLearnError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AzLearnError {
    fn from(err: toml::de::Error) -> Self {
        AzLearnError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from layered configuration errors
impl From<config::ConfigError> for AzLearnError {
    fn from(err: config::ConfigError) -> Self {
        AzLearnError::Configuration(err.to_string())
    }
}
