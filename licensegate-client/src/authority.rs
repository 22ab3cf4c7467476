//! The remote license authority.
//!
//! A confirmation is one GET against the client's endpoint. Only the status
//! code is interpreted: 200 OK confirms the license, anything else (or no
//! answer at all) is a failed attempt.

use crate::error::{LicenseError, LicenseResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Something that can confirm a license endpoint.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Performs one confirmation attempt.
    ///
    /// Returns `Ok(())` only when the authority explicitly confirmed the
    /// license.
    async fn confirm(&self, endpoint: &Url) -> LicenseResult<()>;
}

/// [`Authority`] backed by an HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: Client,
}

impl HttpAuthority {
    /// Creates an HTTP authority whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> LicenseResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LicenseError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn confirm(&self, endpoint: &Url) -> LicenseResult<()> {
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|e| LicenseError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%endpoint, %status, "license server answered");

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(LicenseError::Rejected(status.as_u16()))
        }
    }
}
