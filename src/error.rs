//! Error types for `ssolink`
//!
//! Construction problems are reported as [`ConfigError`] and never retried.
//! Everything that can go wrong after construction is an [`SsoError`].

use thiserror::Error;

/// Errors raised while building a [`crate::config::ControllerConfig`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `client_id` was empty or only whitespace
    #[error("Missing critical config parameter: client_id")]
    MissingClientId,

    /// Environment name is not one of `local`, `staging`, `prod`
    #[error("Unknown environment '{0}' (expected local, staging or prod)")]
    UnknownEnvironment(String),

    /// Base URL override is not an absolute URL
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Refresh rate must be a positive number of milliseconds
    #[error("Refresh rate must be positive, got {0}ms")]
    InvalidRefreshRate(u64),
}

/// Runtime errors surfaced by the session controller
#[derive(Debug, Error)]
pub enum SsoError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// HTTP transport or body decoding failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure reported by a non-HTTP fetcher
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status
    #[error("No data returned from {0}")]
    NoData(String),

    /// The body decoded but did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A cancellable wait was cancelled before it resolved
    #[error("Operation cancelled")]
    Cancelled,
}
