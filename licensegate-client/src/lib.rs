//! Offline-tolerant license validity client.
//!
//! The client periodically confirms with a remote authority that a license is
//! still valid and decides whether the application it protects may keep
//! running.
//!
//! # Behaviour
//!
//! - **Grace window**: failed confirmations are tolerated until the offline
//!   limit has passed since the last success
//! - **Permanent lock**: past the limit, or after [`LicenseClient::close`], the
//!   client is locked for the rest of its life
//! - **Throttled polling**: [`LicenseClient::check`] can be called in a tight
//!   loop; it only dispatches a confirmation once per throttling interval
//! - **Optional auto-repeat**: a background task confirms on a fixed period
//!   until the client is closed
//!
//! # Endpoint
//!
//! The license identifier is percent-encoded as one path segment and appended
//! to the server URL: `https://host/base` + `LI/x` gives
//! `https://host/base/LI%2Fx`.

mod authority;
mod client;
mod config;
mod endpoint;
mod error;
mod state;
mod status;

pub use authority::{Authority, HttpAuthority};
pub use client::{CheckOutcome, LicenseClient};
pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT_MS};
pub use endpoint::{build_endpoint, escape_license};
pub use error::{LicenseError, LicenseResult};
pub use status::ClientStatus;
