//! HTTP client tests against a local axum stub of the monitoring API.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use sentinel_telemetry::{FetchError, FetchErrorKind, HttpTelemetryClient, TelemetryClient};

async fn spawn_stub_api() -> String {
    let app = Router::new()
        .route(
            "/api/v1/dashboard/stats",
            get(|| async { Json(json!({"stats": {"monitored_users": 7}})) }),
        )
        .route(
            "/api/v1/dashboard/network-stats",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/api/v1/dashboard/app-stats",
            get(|| async { "<html>not json</html>" }),
        )
        .route(
            "/api/v1/dashboard/hardware-stats",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

#[tokio::test]
async fn test_success_returns_parsed_payload() {
    let base = spawn_stub_api().await;
    let client = HttpTelemetryClient::new(base, None);

    let payload = client.fetch("/dashboard/stats").await.unwrap();
    assert_eq!(payload.value()["stats"]["monitored_users"], json!(7));
}

#[tokio::test]
async fn test_non_success_status_is_protocol_failure() {
    let base = spawn_stub_api().await;
    let client = HttpTelemetryClient::new(base, None);

    let err = client.fetch("/dashboard/network-stats").await.unwrap_err();
    assert_eq!(err, FetchError::Protocol { status: 500 });
}

#[tokio::test]
async fn test_unknown_route_is_protocol_failure() {
    let base = spawn_stub_api().await;
    let client = HttpTelemetryClient::new(base, None);

    let err = client.fetch("/dashboard/nope").await.unwrap_err();
    assert_eq!(err, FetchError::Protocol { status: 404 });
}

#[tokio::test]
async fn test_malformed_body_is_decode_failure() {
    let base = spawn_stub_api().await;
    let client = HttpTelemetryClient::new(base, None);

    let err = client.fetch("/dashboard/app-stats").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Decode);
}

#[tokio::test]
async fn test_refused_connection_is_network_failure() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpTelemetryClient::new(format!("http://{addr}/api/v1"), None);
    let err = client.fetch("/dashboard/stats").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Network);
}

#[tokio::test]
async fn test_request_timeout_is_network_failure() {
    let base = spawn_stub_api().await;
    let client = HttpTelemetryClient::new(base, Some(Duration::from_millis(200)));

    let err = client.fetch("/dashboard/hardware-stats").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Network);
    assert!(err.to_string().contains("timed out"), "{err}");
}
