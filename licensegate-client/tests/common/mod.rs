#![allow(dead_code)]

use async_trait::async_trait;
use licensegate_client::{Authority, ClientConfig, LicenseError, LicenseResult};
use reqwest::Url;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SERVER: &str = "https://license.test/check";

/// In-memory authority whose availability is switched by the test.
#[derive(Debug, Default)]
pub struct ScriptedAuthority {
    up: AtomicBool,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedAuthority {
    pub fn up() -> Arc<Self> {
        let authority = Self::default();
        authority.up.store(true, Ordering::SeqCst);
        Arc::new(authority)
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An available authority that takes `delay` to answer.
    pub fn slow(delay: Duration) -> Arc<Self> {
        let authority = Self {
            delay: Some(delay),
            ..Default::default()
        };
        authority.up.store(true, Ordering::SeqCst);
        Arc::new(authority)
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authority for ScriptedAuthority {
    async fn confirm(&self, _endpoint: &Url) -> LicenseResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LicenseError::Network("connection refused".into()))
        }
    }
}

/// Configuration pointing at the scripted test server.
pub fn config(offline_limit_ms: u64) -> ClientConfig {
    ClientConfig {
        license: "testing".to_string(),
        server_url: TEST_SERVER.to_string(),
        offline_limit_ms,
        ..Default::default()
    }
}

/// Lets detached tasks run on a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
