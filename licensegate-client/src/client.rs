//! The license client state machine.
//!
//! A client starts trusted. Every failed confirmation is measured against the
//! offline limit: inside the window it is ignored, past it the client locks
//! for good. Nothing unlocks a client, not even a late success.

use crate::authority::{Authority, HttpAuthority};
use crate::config::ClientConfig;
use crate::endpoint::build_endpoint;
use crate::error::{LicenseError, LicenseResult};
use crate::state::{LockFlag, State};
use crate::status::ClientStatus;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of one confirmation attempt that left the client unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The authority confirmed the license.
    Confirmed,
    /// The attempt failed but the offline window is still open.
    Tolerated {
        /// Time left before the next failure locks the client.
        remaining: Duration,
    },
    /// Checks are disabled (no server URL).
    Disabled,
}

/// State shared between the client handle, the background loop and any
/// detached confirmation.
struct Shared {
    license: String,
    endpoint: Option<Url>,
    authority: Option<Arc<dyn Authority>>,
    offline_limit: Duration,
    min_check_interval: Duration,
    session_id: Uuid,
    created_at: DateTime<Utc>,
    locked: LockFlag,
    state: Mutex<State>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the client. Must be called with the state mutex held.
    fn lock(&self, state: &mut State, reason: Option<LicenseError>) {
        if let Some(reason) = reason {
            state.record_terminal(reason);
        }
        if self.locked.set() {
            info!(session = %self.session_id, "license client locked");
        }
    }

    async fn check_server(&self) -> LicenseResult<CheckOutcome> {
        {
            let state = self.state();
            if self.locked.is_set() {
                return Err(state.terminal_error());
            }
        }

        let (Some(endpoint), Some(authority)) = (&self.endpoint, &self.authority) else {
            return Ok(CheckOutcome::Disabled);
        };

        let result = authority.confirm(endpoint).await;

        let mut state = self.state();
        if self.locked.is_set() {
            // Locked while the request was in flight.
            return Err(state.terminal_error());
        }

        let now = Instant::now();
        match result {
            Ok(()) => {
                state.record_success(now, Utc::now());
                debug!(session = %self.session_id, "license confirmed");
                Ok(CheckOutcome::Confirmed)
            }
            Err(err) => {
                if let Some(remaining) = self.is_offline_ok(&mut state, now) {
                    let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
                    if err.is_transient() {
                        warn!(
                            session = %self.session_id,
                            error = %err,
                            remaining_ms,
                            "license check failed, within offline limit"
                        );
                    } else {
                        error!(
                            session = %self.session_id,
                            error = %err,
                            remaining_ms,
                            "authority returned an unexpected error, within offline limit"
                        );
                    }
                    Ok(CheckOutcome::Tolerated { remaining })
                } else {
                    error!(
                        session = %self.session_id,
                        error = %err,
                        "license check failed past the offline limit"
                    );
                    Err(state.terminal_error())
                }
            }
        }
    }

    /// Decides whether a failure at `now` is still tolerated.
    ///
    /// Returns the time left in the window, or `None` after locking the
    /// client because the deadline has been reached.
    fn is_offline_ok(&self, state: &mut State, now: Instant) -> Option<Duration> {
        match state.last_success.checked_add(self.offline_limit) {
            Some(deadline) if now >= deadline => {
                self.lock(
                    state,
                    Some(LicenseError::OfflineTimeout {
                        limit: self.offline_limit,
                    }),
                );
                None
            }
            Some(deadline) => Some(deadline.saturating_duration_since(now)),
            None => Some(Duration::MAX),
        }
    }
}

/// Offline-tolerant license client.
///
/// Construct it once per protected application, poll [`locked`] or
/// [`check`] before running protected code, and [`close`] it on shutdown.
///
/// [`locked`]: LicenseClient::locked
/// [`check`]: LicenseClient::check
/// [`close`]: LicenseClient::close
pub struct LicenseClient {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl LicenseClient {
    /// Creates a client that confirms the license over HTTP.
    ///
    /// Invalid configuration does not fail construction: the client comes
    /// back locked with the configuration error recorded. A client with
    /// checks enabled must be created inside a Tokio runtime, otherwise it
    /// comes back locked with [`LicenseError::NoRuntime`].
    pub fn new(config: ClientConfig) -> Self {
        let authority = HttpAuthority::new(config.request_timeout())
            .map(|a| Arc::new(a) as Arc<dyn Authority>);
        Self::build(config, authority)
    }

    /// Creates a client that confirms the license through `authority`.
    pub fn with_authority(config: ClientConfig, authority: Arc<dyn Authority>) -> Self {
        Self::build(config, Ok(authority))
    }

    fn build(config: ClientConfig, authority: LicenseResult<Arc<dyn Authority>>) -> Self {
        let mut terminal = None;

        let (endpoint, authority) = if config.checks_enabled() {
            let endpoint = match build_endpoint(&config.server_url, &config.license) {
                Ok(url) => Some(url),
                Err(e) => {
                    terminal = Some(e);
                    None
                }
            };
            let authority = match authority {
                Ok(authority) => Some(authority),
                Err(e) => {
                    terminal.get_or_insert(e);
                    None
                }
            };
            (endpoint, authority)
        } else {
            (None, None)
        };

        let auto_repeat = config.auto_repeat().filter(|_| endpoint.is_some());
        let runtime = Handle::try_current().ok();
        if endpoint.is_some() && runtime.is_none() && terminal.is_none() {
            terminal = Some(LicenseError::NoRuntime);
        }

        let now = Utc::now();

        let shared = Arc::new(Shared {
            license: config.license.clone(),
            endpoint,
            authority,
            offline_limit: config.offline_limit(),
            min_check_interval: config.min_check_interval(),
            session_id: Uuid::new_v4(),
            created_at: now,
            locked: LockFlag::default(),
            state: Mutex::new(State::new(Instant::now(), now)),
        });

        let mut shutdown = None;
        if let Some(err) = terminal {
            warn!(session = %shared.session_id, error = %err, "license client misconfigured");
            let mut state = shared.state();
            shared.lock(&mut state, Some(err));
        } else if let (Some(period), Some(runtime)) = (auto_repeat, &runtime) {
            shutdown = Some(spawn_repeat_loop(runtime, Arc::clone(&shared), period));
        }

        info!(
            session = %shared.session_id,
            endpoint = shared.endpoint.as_ref().map(Url::as_str).unwrap_or("-"),
            offline_limit_ms = config.offline_limit_ms,
            auto_repeat_ms = config.auto_repeat_ms,
            "license client created"
        );

        Self {
            shared,
            runtime,
            shutdown: Mutex::new(shutdown),
        }
    }

    /// Cheap on-demand check, safe to call in a tight loop.
    ///
    /// Returns the terminal error if the client is locked. Otherwise, when
    /// the last success (or the last dispatched attempt) is older than the
    /// throttling interval, starts a confirmation on the runtime the client
    /// was created on and returns without waiting for it.
    pub fn check(&self) -> LicenseResult<()> {
        let shared = &self.shared;
        let mut state = shared.state();

        if shared.locked.is_set() {
            return Err(state.terminal_error());
        }
        if shared.endpoint.is_none() {
            return Ok(());
        }

        let now = Instant::now();
        if state.in_flight
            || now.saturating_duration_since(state.throttle_base()) < shared.min_check_interval
        {
            return Ok(());
        }

        let Some(runtime) = &self.runtime else {
            shared.lock(&mut state, Some(LicenseError::NoRuntime));
            return Err(state.terminal_error());
        };

        state.in_flight = true;
        state.last_attempt = Some(now);
        drop(state);

        let shared = Arc::clone(shared);
        runtime.spawn(async move {
            let result = shared.check_server().await;
            shared.state().in_flight = false;
            if let Err(e) = result {
                debug!(session = %shared.session_id, error = %e, "on-demand check found client locked");
            }
        });
        debug!(session = %self.shared.session_id, "license check dispatched");
        Ok(())
    }

    /// Performs one confirmation attempt and waits for it.
    ///
    /// Failures inside the offline window are reported as
    /// [`CheckOutcome::Tolerated`]; an error means the client is locked.
    pub async fn check_server(&self) -> LicenseResult<CheckOutcome> {
        self.shared.check_server().await
    }

    /// Returns true once the client is locked. Never performs I/O.
    #[must_use]
    pub fn locked(&self) -> bool {
        self.shared.locked.is_set()
    }

    /// Stops the background loop, if any, and locks the client.
    ///
    /// Calling it again is harmless.
    pub fn close(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            // The loop may already have exited after locking on its own.
            let _ = tx.send(());
        }

        let mut state = self.shared.state();
        self.shared.lock(&mut state, None);
        info!(session = %self.shared.session_id, "license client closed");
    }

    /// Returns the terminal error, if the client locked on its own.
    #[must_use]
    pub fn last_error(&self) -> Option<LicenseError> {
        self.shared.state().last_error.clone()
    }

    /// Returns the session id.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    /// Returns the license identifier.
    #[must_use]
    pub fn license(&self) -> &str {
        &self.shared.license
    }

    /// Returns the confirmation endpoint, or `None` when checks are
    /// disabled or the configuration was invalid.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.shared.endpoint.as_ref()
    }

    /// Returns the offline limit.
    #[must_use]
    pub fn offline_limit(&self) -> Duration {
        self.shared.offline_limit
    }

    /// Returns the minimum spacing between on-demand checks.
    #[must_use]
    pub fn min_check_interval(&self) -> Duration {
        self.shared.min_check_interval
    }

    /// Returns a diagnostic snapshot.
    #[must_use]
    pub fn status(&self) -> ClientStatus {
        let shared = &self.shared;
        let state = shared.state();
        ClientStatus {
            session_id: shared.session_id,
            license: shared.license.clone(),
            endpoint: shared.endpoint.as_ref().map(Url::to_string),
            created_at: shared.created_at,
            last_success_at: state.last_success_at,
            offline_limit_ms: u64::try_from(shared.offline_limit.as_millis()).unwrap_or(u64::MAX),
            locked: shared.locked.is_set(),
            last_error: state.last_error.as_ref().map(ToString::to_string),
        }
    }
}

impl fmt::Display for LicenseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.status(), f)
    }
}

impl fmt::Debug for LicenseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseClient")
            .field("session_id", &self.shared.session_id)
            .field("endpoint", &self.shared.endpoint)
            .field("locked", &self.locked())
            .finish_non_exhaustive()
    }
}

/// Spawns the background check loop. Dropping or firing the returned sender
/// stops it.
fn spawn_repeat_loop(
    runtime: &Handle,
    shared: Arc<Shared>,
    period: Duration,
) -> oneshot::Sender<()> {
    let (tx, mut rx) = oneshot::channel::<()>();

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(
            session = %shared.session_id,
            period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "license check loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut rx => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut rx => break,
                result = shared.check_server() => {
                    if let Err(e) = result {
                        debug!(session = %shared.session_id, error = %e, "client locked, stopping check loop");
                        return;
                    }
                }
            }
        }
        debug!(session = %shared.session_id, "close requested, license check loop stopped");
    });

    tx
}
