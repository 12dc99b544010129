//! View switching and session ownership.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sentinel_refresh::{Compositor, RefreshSettings, ViewStatus};
use sentinel_telemetry::{Payload, ScriptedTelemetryClient, ViewCatalog, ViewId};

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn setup(client: &ScriptedTelemetryClient) -> (Compositor, Arc<RefreshSettings>) {
    let settings = Arc::new(RefreshSettings::default());
    let compositor = Compositor::new(
        ViewCatalog::default(),
        Arc::new(client.clone()),
        Arc::clone(&settings),
    )
    .unwrap();
    (compositor, settings)
}

#[tokio::test(start_paused = true)]
async fn test_switch_during_fetch_never_applies_old_result() {
    let client = ScriptedTelemetryClient::new();
    let (mut compositor, _settings) = setup(&client);
    settle().await;
    assert_eq!(client.calls(), vec!["/dashboard/stats".to_string()]);

    assert!(compositor.select_view(ViewId::Network).unwrap());
    settle().await;

    let mut pending = client.take_pending();
    assert_eq!(pending.len(), 2);
    let network = pending.pop().unwrap();
    let dashboard = pending.pop().unwrap();
    assert_eq!(dashboard.endpoint(), "/dashboard/stats");
    assert_eq!(network.endpoint(), "/dashboard/network-stats");

    assert!(!dashboard.resolve(Ok(Payload::new(json!({"from": "dashboard"})))));
    settle().await;
    let snap = compositor.snapshot();
    assert_eq!(snap.view, ViewId::Network);
    assert!(snap.session.as_ref().unwrap().state.payload.is_none());

    assert!(network.resolve(Ok(Payload::new(json!({"from": "network"})))));
    settle().await;
    let session = compositor.snapshot().session.unwrap();
    assert_eq!(session.view, ViewId::Network);
    assert_eq!(
        session.state.payload.unwrap().get("from"),
        Some(&json!("network"))
    );
    assert_eq!(client.peak_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_outgoing_session_stops_polling() {
    let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
    let (mut compositor, settings) = setup(&client);
    settle().await;

    compositor.select_view(ViewId::Settings).unwrap();
    tokio::time::advance(Duration::from_millis(10_000)).await;
    settle().await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(settings.observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_settings_change_restarts_only_active_session() {
    let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
    let (mut compositor, settings) = setup(&client);
    settle().await;
    compositor.select_view(ViewId::Hardware).unwrap();
    settle().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(settings.observer_count(), 1);

    settings.set_live(false);
    settle().await;
    assert_eq!(client.call_count(), 3);
    assert_eq!(
        client.calls().last().map(String::as_str),
        Some("/dashboard/hardware-stats")
    );

    tokio::time::advance(Duration::from_millis(10_000)).await;
    settle().await;
    assert_eq!(client.call_count(), 3);
    assert_eq!(
        compositor.snapshot().session.unwrap().status(),
        ViewStatus::Fresh
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_session_uses_current_settings() {
    let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
    let (mut compositor, settings) = setup(&client);
    settings.set_interval(10_000).unwrap();

    compositor.select_view(ViewId::Application).unwrap();
    let session = compositor.snapshot().session.unwrap();
    assert_eq!(session.config.unwrap().interval_ms(), 10_000);
    assert_eq!(session.interval, Some(Duration::from_millis(10_000)));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_forwards_to_active_session() {
    let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
    let (compositor, _settings) = setup(&client);
    settle().await;

    assert!(compositor.refresh_now());
    settle().await;
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_initial_view_can_be_chosen() {
    let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
    let compositor = Compositor::with_initial_view(
        ViewCatalog::default(),
        Arc::new(client.clone()),
        Arc::new(RefreshSettings::default()),
        ViewId::Logs,
    )
    .unwrap();
    settle().await;

    assert_eq!(compositor.active_view(), ViewId::Logs);
    assert_eq!(client.calls(), vec!["/dashboard/stats".to_string()]);
}
