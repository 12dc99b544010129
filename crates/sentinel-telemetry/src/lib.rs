//! Sentinel-X Telemetry - client boundary and view model
//!
//! Everything the refresh controller needs to know about the remote
//! monitoring API: how to fetch one endpoint, which views exist and
//! where they read from, and how a raw JSON payload is projected into
//! the typed models the console renders.

pub mod client;
pub mod error;
pub mod mock_client;
pub mod models;
pub mod payload;
pub mod views;

pub use client::{FetchFuture, HttpTelemetryClient, TelemetryClient, DEFAULT_BASE_URL};
pub use error::{FetchError, FetchErrorKind};
pub use mock_client::{PendingFetch, ScriptedTelemetryClient};
pub use models::{AppStats, DashboardStats, HardwareStats, NetworkStats};
pub use payload::Payload;
pub use views::{ViewCatalog, ViewDescriptor, ViewId};
