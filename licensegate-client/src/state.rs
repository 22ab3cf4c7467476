//! Mutable client state shared between the caller and background tasks.

use crate::error::LicenseError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

/// A flag that can be set but never cleared.
#[derive(Debug, Default)]
pub(crate) struct LockFlag(AtomicBool);

impl LockFlag {
    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sets the flag. Returns true if this call performed the transition.
    pub(crate) fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

/// Timestamps and the terminal error, guarded by the client's mutex.
#[derive(Debug)]
pub(crate) struct State {
    /// Monotonic time of the last confirmed check.
    pub(crate) last_success: Instant,
    /// Wall-clock time of the last confirmed check, for diagnostics.
    pub(crate) last_success_at: DateTime<Utc>,
    /// When the last on-demand confirmation was dispatched.
    pub(crate) last_attempt: Option<Instant>,
    /// Whether an on-demand confirmation is running.
    pub(crate) in_flight: bool,
    /// Why the client locked, if it did so on its own.
    pub(crate) last_error: Option<LicenseError>,
}

impl State {
    pub(crate) fn new(now: Instant, wall: DateTime<Utc>) -> Self {
        Self {
            last_success: now,
            last_success_at: wall,
            last_attempt: None,
            in_flight: false,
            last_error: None,
        }
    }

    /// Records a confirmed check. The timestamp never moves backwards.
    pub(crate) fn record_success(&mut self, now: Instant, wall: DateTime<Utc>) {
        if now >= self.last_success {
            self.last_success = now;
            self.last_success_at = self.last_success_at.max(wall);
        }
    }

    /// Keeps the first terminal error; later ones do not replace it.
    pub(crate) fn record_terminal(&mut self, err: LicenseError) {
        self.last_error.get_or_insert(err);
    }

    /// The error reported by a locked client.
    pub(crate) fn terminal_error(&self) -> LicenseError {
        self.last_error.clone().unwrap_or(LicenseError::Closed)
    }

    /// Reference point for on-demand throttling.
    pub(crate) fn throttle_base(&self) -> Instant {
        match self.last_attempt {
            Some(attempt) => attempt.max(self.last_success),
            None => self.last_success,
        }
    }
}
