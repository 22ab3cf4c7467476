//! Client configuration.
//!
//! Durations are carried as millisecond integers so configuration files stay
//! readable; use the accessor methods to get [`Duration`]s.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default timeout for a single confirmation request (ms).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Configuration used to construct a [`LicenseClient`](crate::LicenseClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// License identifier. Escaped before being appended to the server URL.
    pub license: String,
    /// Authority entry point. Empty disables all checks.
    pub server_url: String,
    /// How long the client may run without a successful check (ms).
    /// Zero means any failed check locks immediately.
    pub offline_limit_ms: u64,
    /// Period of the background check loop (ms). Zero disables the loop.
    pub auto_repeat_ms: u64,
    /// Timeout for one confirmation request (ms).
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            license: String::new(),
            server_url: String::new(),
            offline_limit_ms: 0,
            auto_repeat_ms: 0,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given license and server.
    pub fn new(license: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            license: license.into(),
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Sets the offline limit.
    #[must_use]
    pub fn with_offline_limit(mut self, limit: Duration) -> Self {
        self.offline_limit_ms = duration_to_ms(limit);
        self
    }

    /// Sets the background check period.
    #[must_use]
    pub fn with_auto_repeat(mut self, period: Duration) -> Self {
        self.auto_repeat_ms = duration_to_ms(period);
        self
    }

    /// Parses a configuration from a JSON string. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Returns true if the server URL is set.
    #[must_use]
    pub fn checks_enabled(&self) -> bool {
        !self.server_url.trim().is_empty()
    }

    /// Returns the offline limit.
    #[must_use]
    pub fn offline_limit(&self) -> Duration {
        Duration::from_millis(self.offline_limit_ms)
    }

    /// Returns the minimum spacing between two on-demand checks: one third
    /// of the offline limit.
    #[must_use]
    pub fn min_check_interval(&self) -> Duration {
        self.offline_limit() / 3
    }

    /// Returns the background check period, or `None` when the loop is off.
    #[must_use]
    pub fn auto_repeat(&self) -> Option<Duration> {
        (self.auto_repeat_ms > 0).then(|| Duration::from_millis(self.auto_repeat_ms))
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
