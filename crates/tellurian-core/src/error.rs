//! Error types for the Tellurian reconciler
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Tellurian operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the Tellurian reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The declaration is malformed or misses required fields
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// The provider answered a request with a non-success status
    #[error("Provider request failed ({provider}, status {status}): {message}")]
    ProviderRequestFailed {
        /// Provider name
        provider: String,
        /// HTTP status code returned by the provider
        status: u16,
        /// Error message
        message: String,
    },

    /// A long-running provider operation ended in the `errored` status
    #[error("Provider operation failed: {0}")]
    ProviderOperationFailed(String),

    /// A long-running provider operation did not finish in time
    #[error("Operation timed out after {}s", elapsed.as_secs())]
    TimedOut {
        /// Time spent polling before giving up
        elapsed: Duration,
    },

    /// Waiting on a long-running operation was cancelled
    #[error("Operation cancelled after {}s", elapsed.as_secs())]
    Cancelled {
        /// Time spent polling before the cancellation
        elapsed: Duration,
    },

    /// No API credential was supplied
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors (connection refused, TLS, timeouts, bad bodies)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input handed to a component
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid declaration error
    pub fn invalid_declaration(msg: impl Into<String>) -> Self {
        Self::InvalidDeclaration(msg.into())
    }

    /// Create a provider request error
    pub fn provider_request(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderRequestFailed {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a provider operation error
    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::ProviderOperationFailed(msg.into())
    }

    /// Create a missing credential error
    pub fn missing_credential(msg: impl Into<String>) -> Self {
        Self::MissingCredential(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable, machine-readable code for this error
    ///
    /// These codes are what reports and logs use to classify failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDeclaration(_) => "INVALID_DECLARATION",
            Self::ProviderRequestFailed { .. } | Self::Http(_) => "PROVIDER_REQUEST_FAILED",
            Self::ProviderOperationFailed(_) => "PROVIDER_OPERATION_FAILED",
            Self::TimedOut { .. } => "TIMED_OUT",
            Self::Cancelled { .. } => "CANCELLED",
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::StateStore(_) => "STATE_STORE",
            Self::Config(_) => "CONFIG",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Yaml(_) => "YAML",
            Self::Other(_) => "OTHER",
        }
    }

    /// Whether this error must stop the whole run
    ///
    /// Declaration, credential and configuration errors are fatal. Everything
    /// else is scoped to the action or record that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidDeclaration(_) | Self::MissingCredential(_) | Self::Config(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
