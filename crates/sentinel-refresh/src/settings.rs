//! Shared refresh configuration.
//!
//! A single cell holding the dashboard-wide polling interval and the
//! live/paused flag. Every write goes through one of the setters, and
//! every registered observer has seen the new value by the time the
//! setter returns.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use sentinel_telemetry::ViewDescriptor;

use crate::RefreshError;

/// Shortest interval the controller accepts.
pub const MIN_INTERVAL_MS: u64 = 500;
pub const DEFAULT_INTERVAL_MS: u64 = 2000;
/// Intervals offered by the settings panel.
pub const PRESET_INTERVALS_MS: [u64; 4] = [1000, 2000, 5000, 10000];

/// Polling cadence and live/paused flag.
///
/// The interval can only be set through [`RefreshConfig::new`] or
/// [`RefreshConfig::with_interval_ms`], which enforce the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    interval_ms: u64,
    live: bool,
}

impl RefreshConfig {
    pub fn new(interval_ms: u64, live: bool) -> Result<Self, RefreshError> {
        if interval_ms < MIN_INTERVAL_MS {
            return Err(RefreshError::IntervalTooShort {
                requested_ms: interval_ms,
                floor_ms: MIN_INTERVAL_MS,
            });
        }
        Ok(Self { interval_ms, live })
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn live(&self) -> bool {
        self.live
    }

    pub fn with_live(self, live: bool) -> Self {
        Self { live, ..self }
    }

    pub fn with_interval_ms(self, interval_ms: u64) -> Result<Self, RefreshError> {
        Self::new(interval_ms, self.live)
    }

    /// Interval a poller for `view` should use: the view's own override
    /// (held to the floor) or the shared interval.
    pub fn interval_for(&self, view: &ViewDescriptor) -> Duration {
        match view.poll_interval_override {
            Some(own) => own.max(Duration::from_millis(MIN_INTERVAL_MS)),
            None => self.interval(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            live: true,
        }
    }
}

/// Receives every configuration change, synchronously.
///
/// Implementations must not call back into the settings setters.
pub trait ConfigObserver: Send + Sync {
    fn on_config_change(&self, config: RefreshConfig);
}

struct SettingsState {
    config: RefreshConfig,
    observers: Vec<Weak<dyn ConfigObserver>>,
}

/// The dashboard-wide refresh settings, shared by every poller.
pub struct RefreshSettings {
    state: Mutex<SettingsState>,
    /// Serialises writers so observers see changes in write order.
    write_gate: Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RefreshSettings {
    pub fn new(config: RefreshConfig) -> Self {
        Self {
            state: Mutex::new(SettingsState {
                config,
                observers: Vec::new(),
            }),
            write_gate: Mutex::new(()),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> RefreshConfig {
        lock(&self.state).config
    }

    /// Register an observer. It is held weakly and drops out of the list
    /// once the last strong reference goes away.
    pub fn subscribe<O: ConfigObserver + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<dyn ConfigObserver> = Arc::<O>::downgrade(observer);
        let mut state = lock(&self.state);
        state.observers.retain(|w| w.strong_count() > 0);
        state.observers.push(weak);
    }

    /// Number of observers still alive.
    pub fn observer_count(&self) -> usize {
        lock(&self.state)
            .observers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Replace the configuration. Returns whether anything changed.
    pub fn set(&self, config: RefreshConfig) -> bool {
        self.apply(|_| Ok(config)).unwrap_or(false)
    }

    pub fn set_interval(&self, interval_ms: u64) -> Result<bool, RefreshError> {
        self.apply(|current| current.with_interval_ms(interval_ms))
    }

    pub fn set_live(&self, live: bool) -> bool {
        self.apply(|current| Ok(current.with_live(live)))
            .unwrap_or(false)
    }

    /// Flip live/paused and return the new flag.
    pub fn toggle_live(&self) -> bool {
        let mut live = false;
        let _ = self.apply(|current| {
            live = !current.live();
            Ok(current.with_live(live))
        });
        live
    }

    /// Step to the next faster (`forward == false`) or slower preset.
    ///
    /// An interval outside the presets moves to the nearest preset in the
    /// requested direction; the ends of the list are sticky.
    pub fn cycle_interval(&self, forward: bool) -> RefreshConfig {
        let mut next = self.config();
        let _ = self.apply(|current| {
            let ms = current.interval_ms();
            let target = if forward {
                PRESET_INTERVALS_MS.iter().copied().find(|p| *p > ms)
            } else {
                PRESET_INTERVALS_MS.iter().rev().copied().find(|p| *p < ms)
            };
            next = match target {
                Some(ms) => current.with_interval_ms(ms)?,
                None => current,
            };
            Ok(next)
        });
        next
    }

    /// Read-modify-write under the write gate, then notify observers
    /// outside the state lock so they may read the settings themselves.
    fn apply(
        &self,
        f: impl FnOnce(RefreshConfig) -> Result<RefreshConfig, RefreshError>,
    ) -> Result<bool, RefreshError> {
        let _gate = lock(&self.write_gate);

        let (config, observers) = {
            let mut state = lock(&self.state);
            let config = f(state.config)?;
            if config == state.config {
                return Ok(false);
            }
            state.config = config;
            state.observers.retain(|w| w.strong_count() > 0);
            let observers: Vec<Arc<dyn ConfigObserver>> =
                state.observers.iter().filter_map(Weak::upgrade).collect();
            (config, observers)
        };

        tracing::info!(
            interval_ms = config.interval_ms(),
            live = config.live(),
            observers = observers.len(),
            "Refresh settings changed"
        );

        for observer in observers {
            observer.on_config_change(config);
        }
        Ok(true)
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::new(RefreshConfig::default())
    }
}
