//! Error types for guarded calls to Puppet infrastructure services.
//!
//! Covers the failure modes of outbound calls to PuppetDB and Puppet Server,
//! plus the control errors raised by the resilience layer itself. Each error
//! classifies itself as retryable or not via [`PuppetError::is_retryable`],
//! which is the default predicate consulted by the retry executor.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for guarded Puppet service operations.
pub type PuppetResult<T> = Result<T, PuppetError>;

/// Error type for calls to Puppet infrastructure services.
#[derive(Debug, Error)]
pub enum PuppetError {
    /// Connection refused or host unreachable.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Connection reset mid-flight.
    #[error("Connection reset: {message}")]
    ConnectionReset {
        /// Error message.
        message: String,
    },

    /// Request timed out, including a lost timeout race in the breaker.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// Generic network or socket failure.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Server-side failure (HTTP 5xx) from PuppetDB or Puppet Server.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Error message.
        message: String,
        /// Server-provided duration to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// Invalid request rejected by the remote service (4xx other than
    /// 401/403/404/429).
    #[error("Bad request (HTTP {status}): {message}")]
    BadRequest {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Authentication or authorization failure (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message.
        message: String,
    },

    /// Requested resource does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound {
        /// The type of resource that was not found.
        resource: Option<String>,
        /// Error message.
        message: String,
    },

    /// Response payload could not be decoded.
    #[error("Parse error: {message}")]
    Parse {
        /// Error message.
        message: String,
    },

    /// Invalid construction-time configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// The circuit breaker is open and rejected the call without invoking
    /// the operation. A control error, distinct from any operation failure;
    /// it never wraps an underlying cause.
    #[error("Circuit breaker open: next probe in {}ms", .retry_after.as_millis())]
    CircuitOpen {
        /// Remaining time until the breaker permits a trial call.
        retry_after: Duration,
    },
}

impl PuppetError {
    /// Returns true if this error is worth retrying.
    ///
    /// The default policy retries only transient network-shaped failures:
    /// connection refused/reset, timeouts, generic network errors, HTTP 5xx
    /// and HTTP 429. Everything else, including [`PuppetError::CircuitOpen`],
    /// propagates on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PuppetError::Connection { .. }
                | PuppetError::ConnectionReset { .. }
                | PuppetError::Timeout { .. }
                | PuppetError::Network { .. }
                | PuppetError::Server { .. }
                | PuppetError::RateLimit { .. }
        )
    }

    /// Returns true if this is the breaker's control error.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, PuppetError::CircuitOpen { .. })
    }

    /// Returns the suggested wait before retrying, if one is known.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PuppetError::RateLimit { retry_after, .. } => *retry_after,
            PuppetError::CircuitOpen { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Maps an HTTP status code from a remote service to an error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => PuppetError::Authentication { message },
            404 => PuppetError::NotFound {
                resource: None,
                message,
            },
            429 => PuppetError::RateLimit {
                message,
                retry_after: None,
            },
            400..=499 => PuppetError::BadRequest { status, message },
            _ => PuppetError::Server { status, message },
        }
    }

    /// Creates a not found error for a named resource.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        let resource = resource.into();
        let message = format!("{} '{}' not found", resource, id.into());
        PuppetError::NotFound {
            resource: Some(resource),
            message,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        PuppetError::Timeout {
            message: message.into(),
        }
    }
}
