//! View poller
//!
//! A poll session for one view. Starting a session dispatches a fetch
//! immediately and, while live, one more on every wall-clock tick. At
//! most one fetch is outstanding per session: a tick that lands while a
//! fetch is in flight is skipped.
//!
//! Every start and every stop bumps the session's generation. A fetch
//! remembers the generation it was dispatched under and its result is
//! only applied if that generation is still current.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sentinel_telemetry::{FetchError, Payload, TelemetryClient, ViewDescriptor, ViewId};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::settings::{ConfigObserver, RefreshConfig, RefreshSettings};
use crate::RefreshError;

/// Display status derived from a [`ViewState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// No successful fetch yet.
    Loading,
    Fresh,
    /// Showing an older payload because the latest fetch failed.
    Stale,
}

impl ViewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        }
    }
}

impl std::fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a view currently has to show.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Last successful payload. A failed fetch never clears it.
    pub payload: Option<Payload>,
    /// Set by a failure, cleared by the next success.
    pub last_error: Option<FetchError>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl ViewState {
    pub fn status(&self) -> ViewStatus {
        match (&self.payload, &self.last_error) {
            (None, _) => ViewStatus::Loading,
            (Some(_), Some(_)) => ViewStatus::Stale,
            (Some(_), None) => ViewStatus::Fresh,
        }
    }

    fn record_success(&mut self, payload: Payload) {
        self.payload = Some(payload);
        self.last_error = None;
        self.last_success_at = Some(Utc::now());
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, error: FetchError) {
        self.last_error = Some(error);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub fetches_started: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    /// Ticks that found a fetch still outstanding.
    pub ticks_skipped: u64,
    /// Completions that arrived after their generation was superseded.
    pub stale_discarded: u64,
}

/// A consistent copy of a poller's state, taken under one lock.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub view: ViewId,
    pub generation: u64,
    pub active: bool,
    pub in_flight: bool,
    pub state: ViewState,
    pub stats: PollStats,
    /// Configuration of the current (or last) start.
    pub config: Option<RefreshConfig>,
    /// Tick period while live, `None` when paused or stopped.
    pub interval: Option<Duration>,
}

impl SessionSnapshot {
    pub fn status(&self) -> ViewStatus {
        self.state.status()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Started,
    Skipped,
    /// The generation is gone; the caller should stop ticking.
    Superseded,
}

#[derive(Default)]
struct PollSession {
    generation: u64,
    active: bool,
    config: Option<RefreshConfig>,
    interval: Option<Duration>,
    in_flight: bool,
    timer: Option<JoinHandle<()>>,
    fetch: Option<JoinHandle<()>>,
    state: ViewState,
    stats: PollStats,
}

impl PollSession {
    /// End the current generation. Returns `false` if nothing was running.
    fn halt(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.generation += 1;
        self.in_flight = false;
        self.interval = None;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        true
    }
}

fn lock(session: &Mutex<PollSession>) -> MutexGuard<'_, PollSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct PollerInner {
    view: ViewDescriptor,
    client: Arc<dyn TelemetryClient>,
    runtime: Handle,
    this: Weak<PollerInner>,
    session: Mutex<PollSession>,
}

impl PollerInner {
    fn start(&self, config: RefreshConfig) {
        let mut session = lock(&self.session);
        self.start_locked(&mut session, config);
    }

    fn start_locked(&self, session: &mut PollSession, config: RefreshConfig) {
        session.halt();
        session.generation += 1;
        session.active = true;
        session.config = Some(config);
        let generation = session.generation;

        let interval = config.live().then(|| config.interval_for(&self.view));
        tracing::info!(
            view = %self.view.id,
            generation,
            interval_ms = interval.map(|i| i.as_millis() as u64),
            live = config.live(),
            "Poll session started"
        );

        self.dispatch_locked(session, generation);

        if let Some(period) = interval {
            session.interval = Some(period);
            session.timer = Some(self.spawn_ticker(generation, period));
        }
    }

    fn stop(&self) {
        let mut session = lock(&self.session);
        let generation = session.generation;
        if session.halt() {
            tracing::info!(view = %self.view.id, generation, "Poll session stopped");
        }
    }

    fn restart(&self, config: RefreshConfig) {
        let mut session = lock(&self.session);
        if !session.active {
            tracing::debug!(view = %self.view.id, "Config change ignored, session not started");
            return;
        }
        self.start_locked(&mut session, config);
    }

    fn dispatch(&self, generation: u64) -> Dispatch {
        let mut session = lock(&self.session);
        self.dispatch_locked(&mut session, generation)
    }

    fn dispatch_locked(&self, session: &mut PollSession, generation: u64) -> Dispatch {
        if !session.active || session.generation != generation {
            return Dispatch::Superseded;
        }
        let Some(endpoint) = self.view.endpoint.clone() else {
            return Dispatch::Superseded;
        };
        if session.in_flight {
            session.stats.ticks_skipped += 1;
            tracing::debug!(view = %self.view.id, generation, "Fetch still in flight, tick skipped");
            return Dispatch::Skipped;
        }

        session.in_flight = true;
        session.stats.fetches_started += 1;
        session.state.last_attempt_at = Some(Utc::now());
        tracing::debug!(view = %self.view.id, generation, %endpoint, "Fetch dispatched");

        let client = Arc::clone(&self.client);
        let weak = self.this.clone();
        session.fetch = Some(self.runtime.spawn(async move {
            let result = client.fetch(&endpoint).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete(generation, result);
            }
        }));
        Dispatch::Started
    }

    fn spawn_ticker(&self, generation: u64, period: Duration) -> JoinHandle<()> {
        let weak = self.this.clone();
        let first = Instant::now() + period;
        self.runtime.spawn(async move {
            let mut ticks = tokio::time::interval_at(first, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.dispatch(generation) == Dispatch::Superseded {
                    break;
                }
            }
        })
    }

    fn complete(&self, generation: u64, result: Result<Payload, FetchError>) {
        let mut session = lock(&self.session);
        if session.generation != generation {
            session.stats.stale_discarded += 1;
            tracing::debug!(
                view = %self.view.id,
                generation,
                current = session.generation,
                "Discarding result from superseded generation"
            );
            return;
        }

        session.in_flight = false;
        session.fetch = None;
        match result {
            Ok(payload) => {
                session.stats.fetches_succeeded += 1;
                session.state.record_success(payload);
            }
            Err(error) => {
                session.stats.fetches_failed += 1;
                tracing::warn!(view = %self.view.id, generation, %error, "Fetch failed");
                session.state.record_failure(error);
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let session = lock(&self.session);
        SessionSnapshot {
            view: self.view.id,
            generation: session.generation,
            active: session.active,
            in_flight: session.in_flight,
            state: session.state.clone(),
            stats: session.stats,
            config: session.config,
            interval: session.interval,
        }
    }
}

impl ConfigObserver for PollerInner {
    fn on_config_change(&self, config: RefreshConfig) {
        self.restart(config);
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        session.halt();
    }
}

/// Owns the poll session for one view. Dropping it stops the session.
pub struct ViewPoller {
    inner: Arc<PollerInner>,
}

impl ViewPoller {
    /// Create a stopped poller. Must be called from inside a tokio runtime;
    /// the poller's tasks are spawned onto it.
    pub fn new(view: ViewDescriptor, client: Arc<dyn TelemetryClient>) -> Result<Self, RefreshError> {
        let runtime = Handle::try_current().map_err(|_| RefreshError::NoRuntime)?;
        let inner = Arc::new_cyclic(|this| PollerInner {
            view,
            client,
            runtime,
            this: this.clone(),
            session: Mutex::new(PollSession::default()),
        });
        Ok(Self { inner })
    }

    /// Create a poller, subscribe it to `settings` and start it with the
    /// current configuration.
    pub fn mount(
        view: ViewDescriptor,
        client: Arc<dyn TelemetryClient>,
        settings: &RefreshSettings,
    ) -> Result<Self, RefreshError> {
        let poller = Self::new(view, client)?;
        settings.subscribe(&poller.inner);
        let config = settings.config();
        poller.start(config);
        // A write that landed between reading and starting was ignored.
        let latest = settings.config();
        if latest != config {
            poller.on_config_change(latest);
        }
        Ok(poller)
    }

    pub fn view(&self) -> &ViewDescriptor {
        &self.inner.view
    }

    /// Begin a new generation: fetch now and, when live, on every tick.
    /// Restarts the session if it is already running.
    pub fn start(&self, config: RefreshConfig) {
        self.inner.start(config);
    }

    /// Cancel the timer and any in-flight fetch. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Restart with `config`. Ignored while stopped.
    pub fn on_config_change(&self, config: RefreshConfig) {
        self.inner.restart(config);
    }

    /// Fetch now, outside the tick schedule. Returns `false` when the
    /// session is stopped or a fetch is already outstanding.
    pub fn refresh_now(&self) -> bool {
        let mut session = lock(&self.inner.session);
        let generation = session.generation;
        self.inner.dispatch_locked(&mut session, generation) == Dispatch::Started
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.session).active
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }
}

impl std::fmt::Debug for ViewPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewPoller")
            .field("view", &self.inner.view.id)
            .finish_non_exhaustive()
    }
}
