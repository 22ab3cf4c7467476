//! Diagnostic snapshot of a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Point-in-time view of a [`LicenseClient`](crate::LicenseClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    /// Random id of this client instance.
    pub session_id: Uuid,
    /// License identifier as configured.
    pub license: String,
    /// Confirmation endpoint, if checks are enabled and the URL was valid.
    pub endpoint: Option<String>,
    /// When the client was constructed.
    pub created_at: DateTime<Utc>,
    /// When the authority last confirmed the license.
    pub last_success_at: DateTime<Utc>,
    /// Offline limit in milliseconds.
    pub offline_limit_ms: u64,
    /// Whether the client is locked.
    pub locked: bool,
    /// Terminal error message, if the client locked on its own.
    pub last_error: Option<String>,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "License client")?;
        writeln!(f, "==============")?;
        writeln!(f, "session:      {}", self.session_id)?;
        writeln!(f, "created:      {}", self.created_at.to_rfc3339())?;
        writeln!(f, "last success: {}", self.last_success_at.to_rfc3339())?;
        writeln!(f, "offline max:  {}ms", self.offline_limit_ms)?;
        writeln!(f, "locked:       {}", self.locked)?;
        writeln!(f, "error:        {}", self.last_error.as_deref().unwrap_or("-"))?;
        writeln!(f, "license:      {}", self.license)?;
        write!(f, "endpoint:     {}", self.endpoint.as_deref().unwrap_or("-"))
    }
}
