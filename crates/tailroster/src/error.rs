//! Error types for tailroster.
//!
//! This module defines the crate-level error type. Per-identifier lookup
//! failures are deliberately NOT part of it: they live in
//! [`crate::lookup::FetchError`] and are absorbed by the roster aggregator.

use thiserror::Error;

/// The main error type for tailroster operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Identifier Errors ===
    /// An identifier supplied by a user or config file was rejected.
    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The working set could not be filled before the attempt cap was hit.
    #[error(
        "identifier pool exhausted: produced {produced} of {target} identifiers after {attempts} attempts"
    )]
    PoolExhausted {
        /// Requested working set size.
        target: usize,
        /// Number of unique identifiers produced before giving up.
        produced: usize,
        /// Number of candidates drawn.
        attempts: usize,
    },

    // === Aggregation Errors ===
    /// The concurrent fan-out could not be started at all.
    #[error("system failure: {message}")]
    SystemFailure {
        /// Description of what went wrong.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tailroster operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new system failure error.
    #[must_use]
    pub fn system_failure(message: impl Into<String>) -> Self {
        Self::SystemFailure {
            message: message.into(),
        }
    }

    /// Create an invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error means the fan-out never ran.
    #[must_use]
    pub fn is_system_failure(&self) -> bool {
        matches!(self, Self::SystemFailure { .. })
    }

    /// Check if this error is an exhausted identifier pool.
    #[must_use]
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::system_failure("no runtime");
        assert_eq!(err.to_string(), "system failure: no runtime");
    }

    #[test]
    fn test_error_is_system_failure() {
        assert!(Error::system_failure("x").is_system_failure());
        assert!(!Error::HttpClient("x".to_string()).is_system_failure());
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = Error::PoolExhausted {
            target: 15,
            produced: 9,
            attempts: 100,
        };
        assert!(err.is_pool_exhausted());
        let msg = err.to_string();
        assert!(msg.contains("9 of 15"));
        assert!(msg.contains("100 attempts"));
    }

    #[test]
    fn test_invalid_identifier_display() {
        let err = Error::invalid_identifier("??", "unexpected character");
        let msg = err.to_string();
        assert!(msg.contains("??"));
        assert!(msg.contains("unexpected character"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "deadline_ms must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("deadline_ms"));
    }

    #[test]
    fn test_http_client_error_display() {
        let err = Error::HttpClient("tls backend unavailable".to_string());
        assert!(err.to_string().contains("tls backend"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }
}
