//! Poll session timing and concurrency, on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sentinel_refresh::{RefreshConfig, RefreshSettings, ViewPoller, ViewStatus};
use sentinel_telemetry::{FetchError, Payload, ScriptedTelemetryClient, ViewDescriptor, ViewId};

fn dashboard() -> ViewDescriptor {
    ViewDescriptor::polled(ViewId::Dashboard, "/dashboard/stats")
}

fn payload(n: u64) -> Payload {
    Payload::new(json!({ "stats": { "monitored_users": n } }))
}

fn poller(client: &ScriptedTelemetryClient) -> ViewPoller {
    ViewPoller::new(dashboard(), Arc::new(client.clone())).unwrap()
}

/// Let spawned tasks run without moving the clock.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

fn config(interval_ms: u64, live: bool) -> RefreshConfig {
    RefreshConfig::new(interval_ms, live).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_anchored_to_start_not_to_responses() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    assert_eq!(client.call_count(), 1, "immediate fetch on start");

    advance_ms(100).await;
    assert!(client.resolve_next(Ok(payload(1))));
    settle().await;
    assert_eq!(poller.snapshot().status(), ViewStatus::Fresh);

    advance_ms(1800).await; // t = 1900
    assert_eq!(client.call_count(), 1);

    advance_ms(100).await; // t = 2000
    assert_eq!(client.call_count(), 2);
    assert!(client.resolve_next(Ok(payload(2))));

    advance_ms(1900).await; // t = 3900
    assert_eq!(client.call_count(), 2);
    advance_ms(100).await; // t = 4000
    assert_eq!(client.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_tick_is_skipped_while_fetch_in_flight() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;

    advance_ms(2000).await;
    advance_ms(2000).await;
    let snap = poller.snapshot();
    assert_eq!(client.call_count(), 1);
    assert_eq!(snap.stats.ticks_skipped, 2);
    assert!(snap.in_flight);

    advance_ms(500).await; // t = 4500
    assert!(client.resolve_next(Ok(payload(1))));
    settle().await;
    assert!(!poller.snapshot().in_flight);

    // Skipped ticks are not queued: the next fetch waits for t = 6000.
    advance_ms(1400).await;
    assert_eq!(client.call_count(), 1);
    advance_ms(100).await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(client.peak_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_fetch_after_stop() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    assert_eq!(client.call_count(), 1);

    poller.stop();
    let generation = poller.snapshot().generation;
    advance_ms(10_000).await;
    assert_eq!(client.call_count(), 1);

    poller.stop();
    let snap = poller.snapshot();
    assert_eq!(snap.generation, generation, "second stop is a no-op");
    assert!(!snap.active);
    assert_eq!(snap.state.payload, Some(payload(1)));
}

#[tokio::test(start_paused = true)]
async fn test_stop_drops_in_flight_fetch() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    assert_eq!(client.active(), 1);

    poller.stop();
    assert!(!poller.snapshot().in_flight);
    settle().await;

    assert_eq!(client.cancelled(), 1);
    assert!(!client.resolve_next(Ok(payload(9))));
    assert!(poller.snapshot().state.payload.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_restart_discards_superseded_response() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    let first_generation = poller.snapshot().generation;

    poller.on_config_change(config(5000, true));
    settle().await;
    assert_eq!(client.call_count(), 2, "config change fetches immediately");
    assert_eq!(poller.snapshot().generation, first_generation + 2);

    let mut pending = client.take_pending();
    assert_eq!(pending.len(), 2);
    let newer = pending.pop().unwrap();
    let older = pending.pop().unwrap();
    assert!(!older.resolve(Ok(payload(1))), "old fetch was cancelled");
    assert!(newer.resolve(Ok(payload(2))));
    settle().await;

    let snap = poller.snapshot();
    assert_eq!(snap.state.payload, Some(payload(2)));
    assert_eq!(snap.stats.fetches_succeeded, 1);
    assert_eq!(client.peak_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_config_change_adopts_new_cadence() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    advance_ms(1000).await;

    poller.on_config_change(config(5000, true)); // t = 1000
    settle().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(
        poller.snapshot().interval,
        Some(Duration::from_millis(5000))
    );

    advance_ms(4900).await; // t = 5900, old cadence would have fired twice
    assert_eq!(client.call_count(), 2);
    advance_ms(100).await; // t = 6000
    assert_eq!(client.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_keeps_data_and_resume_fetches_immediately() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;

    poller.on_config_change(config(2000, false));
    settle().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(poller.snapshot().interval, None);

    advance_ms(10_000).await;
    assert_eq!(client.call_count(), 2, "no scheduled fetches while paused");
    assert_eq!(poller.snapshot().state.payload, Some(payload(1)));

    poller.on_config_change(config(2000, true));
    settle().await;
    assert_eq!(client.call_count(), 3);
    advance_ms(2000).await;
    assert_eq!(client.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_paused_start_fetches_once() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let poller = poller(&client);

    poller.start(config(1000, false));
    settle().await;
    advance_ms(5000).await;

    assert_eq!(client.call_count(), 1);
    assert!(poller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_polling_and_last_payload() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;
    client.set_auto_response(Some(Err(FetchError::Protocol { status: 503 })));

    advance_ms(2000).await;
    let snap = poller.snapshot();
    assert_eq!(snap.status(), ViewStatus::Stale);
    assert_eq!(snap.state.payload, Some(payload(1)));
    assert_eq!(snap.state.last_error, Some(FetchError::Protocol { status: 503 }));
    assert!(snap.active);

    advance_ms(2000).await;
    let snap = poller.snapshot();
    assert_eq!(snap.state.consecutive_failures, 2);
    assert_eq!(snap.stats.fetches_failed, 2);

    client.set_auto_response(Some(Ok(payload(3))));
    advance_ms(2000).await;
    let snap = poller.snapshot();
    assert_eq!(snap.status(), ViewStatus::Fresh);
    assert_eq!(snap.state.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_before_first_success_stays_loading() {
    let client = ScriptedTelemetryClient::responding(Err(FetchError::Network(
        "connection refused".into(),
    )));
    let poller = poller(&client);

    poller.start(RefreshConfig::default());
    settle().await;

    let snap = poller.snapshot();
    assert_eq!(snap.status(), ViewStatus::Loading);
    assert!(snap.state.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_respects_in_flight_rule() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    assert!(!poller.refresh_now(), "stopped poller does not fetch");

    poller.start(RefreshConfig::default());
    settle().await;
    assert!(!poller.refresh_now());

    client.resolve_next(Ok(payload(1)));
    settle().await;
    assert!(poller.refresh_now());
    settle().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(poller.snapshot().stats.fetches_started, 2);
}

#[tokio::test(start_paused = true)]
async fn test_config_change_ignored_when_stopped() {
    let client = ScriptedTelemetryClient::new();
    let poller = poller(&client);

    poller.on_config_change(config(1000, true));
    settle().await;
    assert_eq!(client.call_count(), 0);
    assert!(!poller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_view_override_sets_its_own_cadence() {
    let client = ScriptedTelemetryClient::responding(Ok(payload(1)));
    let view = ViewDescriptor::polled(ViewId::Risks, "/dashboard/stats")
        .with_poll_interval(Duration::from_millis(5000));
    let poller = ViewPoller::new(view, Arc::new(client.clone())).unwrap();

    poller.start(RefreshConfig::default());
    settle().await;
    advance_ms(4000).await;
    assert_eq!(client.call_count(), 1);
    advance_ms(1000).await;
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_settings_change_reaches_every_mounted_poller_synchronously() {
    let client = ScriptedTelemetryClient::new();
    let settings = RefreshSettings::default();
    let a = ViewPoller::mount(dashboard(), Arc::new(client.clone()), &settings).unwrap();
    let b = ViewPoller::mount(
        ViewDescriptor::polled(ViewId::Network, "/dashboard/network-stats"),
        Arc::new(client.clone()),
        &settings,
    )
    .unwrap();
    assert_eq!(settings.observer_count(), 2);
    let before = (a.snapshot().generation, b.snapshot().generation);

    settings.set_interval(10_000).unwrap();

    // No yield in between: the restart happened inside the setter.
    for (poller, generation) in [(&a, before.0), (&b, before.1)] {
        let snap = poller.snapshot();
        assert_eq!(snap.generation, generation + 2);
        assert_eq!(snap.config.map(|c| c.interval_ms()), Some(10_000));
        assert_eq!(snap.stats.fetches_started, 2);
    }

    drop(a);
    assert_eq!(settings.observer_count(), 1);
}
