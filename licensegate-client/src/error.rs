//! Error types for the license client.

use std::time::Duration;
use thiserror::Error;

/// License client errors.
///
/// Errors are `Clone` so the terminal error that locked a client can be kept
/// in its state and handed back on every later check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    /// The configured server URL cannot be used.
    #[error("invalid server url: {0}")]
    InvalidServerUrl(String),

    /// The license identifier cannot be placed in a URL path segment.
    #[error("invalid license identifier: {0}")]
    InvalidLicense(String),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),

    /// Checks were enabled outside a Tokio runtime.
    #[error("license checks require a Tokio runtime")]
    NoRuntime,

    /// The authority could not be reached (connection error, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The authority answered with something other than 200 OK.
    #[error("license server rejected the check (HTTP {0})")]
    Rejected(u16),

    /// No successful confirmation within the offline limit.
    #[error("exceeded offline limit of {limit:?} without reaching the license server")]
    OfflineTimeout {
        /// The configured offline limit.
        limit: Duration,
    },

    /// The client was closed.
    #[error("license client closed")]
    Closed,

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LicenseError {
    /// Returns true for failures that are absorbed while still inside the
    /// offline tolerance window.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected(_))
    }
}

impl From<serde_json::Error> for LicenseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
