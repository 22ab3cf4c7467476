//! Mock license authority.
//!
//! Answers every `GET /<anything>` with 200 OK, except when the last path
//! segment names a revoked license (403). `GET /quit` shuts the server down
//! shortly after answering.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    routing::get,
    Router,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

/// Delay between answering `/quit` and shutting down.
pub const QUIT_DELAY: Duration = Duration::from_millis(300);

/// Shared state of the mock authority.
#[derive(Debug, Default)]
pub struct MockState {
    revoked: HashSet<String>,
    requests: AtomicU64,
    quit: Notify,
}

impl MockState {
    /// Creates the state with the given revoked licenses.
    pub fn new(revoked: impl IntoIterator<Item = String>) -> Arc<Self> {
        Arc::new(Self {
            revoked: revoked.into_iter().collect(),
            ..Default::default()
        })
    }

    /// Number of license requests answered so far (`/quit` excluded).
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Completes once `/quit` has been requested and the delay elapsed.
    pub async fn quit_requested(&self) {
        self.quit.notified().await;
    }

    fn is_revoked(&self, path: &str) -> bool {
        let last = path.rsplit('/').next().unwrap_or_default();
        let license = urlencoding::decode(last).map(|s| s.into_owned());
        license.is_ok_and(|license| self.revoked.contains(&license))
    }
}

async fn quit_handler(State(state): State<Arc<MockState>>) -> &'static str {
    info!("Closing server ...");
    tokio::spawn(async move {
        tokio::time::sleep(QUIT_DELAY).await;
        state.quit.notify_one();
    });
    "Closing server ..."
}

async fn license_handler(State(state): State<Arc<MockState>>, uri: Uri) -> (StatusCode, String) {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let path = uri.path();

    if state.is_revoked(path) {
        info!("Revoked license requested : {:?}", path);
        return (StatusCode::FORBIDDEN, format!("License revoked : {path:?}"));
    }

    info!("Url requested : {:?}", path);
    (StatusCode::OK, format!("Url requested : {path:?}"))
}

/// Build the mock authority router.
pub fn build_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/quit", get(quit_handler))
        .fallback(license_handler)
        .with_state(state)
}

/// Serves the mock authority on `listener` until `/quit` is requested.
pub async fn serve(listener: TcpListener, state: Arc<MockState>) -> std::io::Result<()> {
    let app = build_router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { state.quit_requested().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_matches_decoded_last_segment() {
        let state = MockState::new(["LI/x".to_string(), "plain".to_string()]);
        assert!(state.is_revoked("/licenses/LI%2Fx"));
        assert!(state.is_revoked("/plain"));
        assert!(!state.is_revoked("/plain/other"));
        assert!(!state.is_revoked("/"));
    }
}
