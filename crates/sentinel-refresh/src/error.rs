use sentinel_telemetry::ViewId;

/// Errors surfaced by the refresh controller.
///
/// Fetch failures are not here: they live in each view's state and never
/// propagate out of a poller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh interval {requested_ms}ms is below the {floor_ms}ms floor")]
    IntervalTooShort { requested_ms: u64, floor_ms: u64 },

    #[error("pollers must be created inside a tokio runtime")]
    NoRuntime,

    #[error("view '{0}' is not in the catalog")]
    UnknownView(ViewId),
}
