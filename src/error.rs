//! Error types for o365-audit-dl
//!
//! Most failures in this crate never reach the caller: subscription checks, content
//! discovery and blob downloads log their errors and degrade to an empty or partial
//! result, leaving recovery to the next polling cycle. The [`Error`] type covers what
//! does propagate (configuration, certificate loading, a closed sink) and is also the
//! internal currency of the HTTP helpers before they are logged.

use thiserror::Error;

/// Result type alias for o365-audit-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for o365-audit-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "content_type")
        key: Option<String>,
    },

    /// Client certificate could not be read or decrypted
    #[error("credential error: {0}")]
    Credential(String),

    /// Token acquisition failed and no previous token is available
    #[error("token error: {0}")]
    Token(String),

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned HTTP {status} for {url}")]
    Api {
        /// HTTP status code returned by the API
        status: u16,
        /// Request URL, without query string
        url: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed URL (base URL, next page reference, content URI)
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid cron schedule
    #[error("schedule error: {0}")]
    Schedule(String),

    /// The record consumer went away
    #[error("record sink closed")]
    SinkClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Credential(_) => "credential_error",
            Error::Token(_) => "token_error",
            Error::Network(e) if e.is_timeout() => "timeout",
            Error::Network(_) => "network_error",
            Error::Api { .. } => "api_error",
            Error::Serialization(_) => "serialization_error",
            Error::Url(_) => "invalid_url",
            Error::Schedule(_) => "schedule_error",
            Error::SinkClosed => "sink_closed",
            Error::Io(_) => "io_error",
        }
    }

    /// True when the API rejected the bearer token.
    ///
    /// A failed refresh keeps the stale token in place, so this is the expected symptom
    /// until a later refresh succeeds.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
