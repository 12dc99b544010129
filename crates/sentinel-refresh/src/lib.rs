//! Sentinel-X live-refresh controller
//!
//! One shared [`RefreshSettings`] cell, one [`ViewPoller`] per mounted
//! view, and a [`Compositor`] that keeps exactly one poller alive for
//! whichever view is active.

pub mod compositor;
pub mod error;
pub mod poller;
pub mod settings;

pub use compositor::{Compositor, CompositorSnapshot};
pub use error::RefreshError;
pub use poller::{PollStats, SessionSnapshot, ViewPoller, ViewState, ViewStatus};
pub use settings::{
    ConfigObserver, RefreshConfig, RefreshSettings, DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS,
    PRESET_INTERVALS_MS,
};
