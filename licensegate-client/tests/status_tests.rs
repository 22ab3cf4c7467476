mod common;

use common::{config, ScriptedAuthority, TEST_SERVER};
use licensegate_client::{ClientStatus, LicenseClient};
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn status_reflects_fresh_client() {
    let client = LicenseClient::with_authority(config(1_500), ScriptedAuthority::up());
    let status = client.status();

    assert_eq!(status.session_id, client.session_id());
    assert_eq!(status.license, "testing");
    assert_eq!(status.endpoint, Some(format!("{TEST_SERVER}/testing")));
    assert_eq!(status.offline_limit_ms, 1_500);
    assert!(!status.locked);
    assert_eq!(status.last_error, None);
    assert_eq!(status.last_success_at, status.created_at);
}

#[tokio::test(start_paused = true)]
async fn status_reports_lock_reason() {
    let client = LicenseClient::with_authority(config(0), ScriptedAuthority::down());
    let _ = client.check_server().await;

    let status = client.status();
    assert!(status.locked);
    assert!(status.last_error.unwrap().contains("offline limit"));
}

#[tokio::test(start_paused = true)]
async fn sessions_are_unique() {
    let a = LicenseClient::with_authority(config(0), ScriptedAuthority::up());
    let b = LicenseClient::with_authority(config(0), ScriptedAuthority::up());
    assert_ne!(a.session_id(), b.session_id());
}

#[tokio::test(start_paused = true)]
async fn display_dump_lists_fields() {
    let client = LicenseClient::with_authority(config(1_000), ScriptedAuthority::up());
    client.close();

    let dump = client.to_string();
    assert!(dump.contains(&client.session_id().to_string()));
    assert!(dump.contains("offline max:  1000ms"));
    assert!(dump.contains("locked:       true"));
    assert!(dump.contains("error:        -"));
    assert!(dump.contains("endpoint:     https://license.test/check/testing"));
}

#[tokio::test(start_paused = true)]
async fn status_serde_roundtrip() {
    let client = LicenseClient::with_authority(config(1_000), ScriptedAuthority::up());
    let status = client.status();

    let json = serde_json::to_string(&status).unwrap();
    let parsed: ClientStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, status);
}
