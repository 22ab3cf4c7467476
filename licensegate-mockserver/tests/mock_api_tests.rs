use licensegate_client::{CheckOutcome, ClientConfig, LicenseClient};
use licensegate_mockserver::{build_router, serve, MockState};
use std::sync::Arc;
use std::time::Duration;

/// Spin up the mock authority on an OS-assigned port, returning the base URL.
async fn spawn_test_server(state: Arc<MockState>) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn any_path_is_echoed_with_ok() {
    let base = spawn_test_server(Arc::new(MockState::default())).await;
    let resp = reqwest::get(format!("{}/licenses/LIC-1", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert_eq!(body, r#"Url requested : "/licenses/LIC-1""#);
}

#[tokio::test]
async fn revoked_license_is_forbidden() {
    let base = spawn_test_server(MockState::new(["LIC-42".to_string()])).await;

    let resp = reqwest::get(format!("{}/licenses/LIC-42", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = reqwest::get(format!("{}/licenses/LIC-43", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn requests_are_counted() {
    let state = Arc::new(MockState::default());
    let base = spawn_test_server(state.clone()).await;

    for _ in 0..3 {
        reqwest::get(format!("{}/x", base)).await.unwrap();
    }
    assert_eq!(state.requests(), 3);
}

#[tokio::test]
async fn quit_stops_the_server() {
    let state = Arc::new(MockState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(serve(listener, state.clone()));

    let resp = reqwest::get(format!("{}/quit", base)).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "Closing server ...");

    let stopped = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(stopped.is_ok(), "server should stop after /quit");
    assert_eq!(state.requests(), 0);
}

#[tokio::test]
async fn repeating_client_stays_unlocked_against_mock() {
    let state = Arc::new(MockState::default());
    let base = spawn_test_server(state.clone()).await;

    let client = LicenseClient::new(
        ClientConfig::new("testing", base)
            .with_offline_limit(Duration::from_secs(1))
            .with_auto_repeat(Duration::from_millis(300)),
    );
    assert!(!client.locked());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!client.locked());
    assert!(state.requests() >= 5);

    client.close();
    assert!(client.locked());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(client.locked());
}

#[tokio::test]
async fn revoked_license_locks_client_without_grace() {
    let state = MockState::new(["LI/../LI".to_string()]);
    let base = spawn_test_server(state).await;

    let client = LicenseClient::new(ClientConfig::new("LI/../LI", format!("{base}/licenses")));
    assert!(client.check_server().await.is_err());
    assert!(client.locked());

    let ok = LicenseClient::new(ClientConfig::new("other", format!("{base}/licenses")));
    assert_eq!(ok.check_server().await, Ok(CheckOutcome::Confirmed));
}
