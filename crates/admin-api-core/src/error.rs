//! Core error types for admin-api.
//!
//! This module provides the error enum [`ApiError`] covering every failure a
//! remote queryset can surface: malformed lookup keys, transport failures,
//! invalid local indexing, ambiguous or missing `get()` results, malformed
//! response bodies, and configuration problems.

use thiserror::Error;

/// The primary error type for admin-api.
///
/// Local errors (`MalformedKey`, `IndexOutOfRange`, `InvalidSlice`) are raised
/// before any request is sent. `Transport` and `ConnectionError` come from the
/// remote side and are never retried.
#[derive(Error, Debug)]
pub enum ApiError {
    // ── Filter codec ─────────────────────────────────────────────────

    /// A lookup key was empty or contained an empty segment.
    #[error("Malformed lookup key: {0:?}")]
    MalformedKey(String),

    /// A filter value cannot be expressed for its lookup, such as `null`
    /// compared with `gte`.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // ── Transport ────────────────────────────────────────────────────

    /// The remote endpoint answered with a non-success status.
    #[error("Transport error: HTTP {status}: {body}")]
    Transport {
        /// The HTTP status code returned by the server.
        status: u16,
        /// The decoded response body.
        body: serde_json::Value,
    },

    /// The request could not be completed at all (connect, timeout, decode).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    // ── Local indexing ───────────────────────────────────────────────

    /// A positional index pointed past the end of the realized results.
    #[error("Index out of range: {0}")]
    IndexOutOfRange(usize),

    /// A slice had negative bounds or a zero step.
    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    // ── get() ────────────────────────────────────────────────────────

    /// `get()` matched no objects.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// `get()` matched more than one object.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A model instance without a primary key was asked to do something
    /// that needs one.
    #[error("Missing primary key: {0}")]
    MissingPrimaryKey(String),

    // ── Wire format ──────────────────────────────────────────────────

    /// An action name outside the fixed set of five.
    #[error("Unknown action: {0:?}")]
    UnknownAction(String),

    /// The response body did not have the expected `count` / `data` shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A wire record could not be converted to or from a domain object.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ApiError {
    /// Returns the HTTP status code a server should answer with for this error.
    ///
    /// - `MalformedKey`, `InvalidFilter`, `InvalidSlice`, `IndexOutOfRange`, `SerializationError`,
    ///   `MissingPrimaryKey`, `UnknownAction` -> 400
    /// - `DoesNotExist` -> 404
    /// - `Transport` -> the remote status, passed through
    /// - `ConnectionError`, `InvalidResponse` -> 502
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MalformedKey(_)
            | Self::InvalidFilter(_)
            | Self::InvalidSlice(_)
            | Self::IndexOutOfRange(_)
            | Self::SerializationError(_)
            | Self::MissingPrimaryKey(_)
            | Self::UnknownAction(_) => 400,
            Self::DoesNotExist(_) => 404,
            Self::Transport { status, .. } => *status,
            Self::ConnectionError(_) | Self::InvalidResponse(_) => 502,
            Self::MultipleObjectsReturned(_) | Self::ConfigurationError(_) | Self::IoError(_) => {
                500
            }
        }
    }

    /// Returns `true` if the error originated on the far side of the transport.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ConnectionError(_))
    }
}

/// A convenience type alias for `Result<T, ApiError>`.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::MalformedKey(String::new()).status_code(), 400);
        assert_eq!(ApiError::InvalidSlice("x".into()).status_code(), 400);
        assert_eq!(ApiError::IndexOutOfRange(3).status_code(), 400);
        assert_eq!(ApiError::DoesNotExist("x".into()).status_code(), 404);
        assert_eq!(ApiError::MissingPrimaryKey("x".into()).status_code(), 400);
        assert_eq!(ApiError::UnknownAction("x".into()).status_code(), 400);
        assert_eq!(ApiError::InvalidFilter("x".into()).status_code(), 400);
        assert_eq!(
            ApiError::MultipleObjectsReturned("x".into()).status_code(),
            500
        );
        assert_eq!(ApiError::ConnectionError("x".into()).status_code(), 502);
        assert_eq!(ApiError::InvalidResponse("x".into()).status_code(), 502);
        assert_eq!(
            ApiError::ConfigurationError("x".into()).status_code(),
            500
        );
    }

    #[test]
    fn test_transport_status_passthrough() {
        let err = ApiError::Transport {
            status: 409,
            body: serde_json::json!({"detail": "conflict"}),
        };
        assert_eq!(err.status_code(), 409);
        assert!(err.is_transport());
        assert!(err.to_string().contains("HTTP 409"));
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn test_local_errors_are_not_transport() {
        assert!(!ApiError::MalformedKey("a..b".into()).is_transport());
        assert!(!ApiError::IndexOutOfRange(0).is_transport());
        assert!(ApiError::ConnectionError("refused".into()).is_transport());
    }

    #[test]
    fn test_malformed_key_display() {
        let err = ApiError::MalformedKey(String::new());
        assert_eq!(err.to_string(), "Malformed lookup key: \"\"");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let api_err: ApiError = io_err.into();
        assert_eq!(api_err.status_code(), 500);
        assert!(api_err.to_string().contains("file missing"));
    }
}
