//! Dashboard views and the endpoints they read from.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One selectable dashboard panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    Dashboard,
    Network,
    Application,
    Hardware,
    Logs,
    Risks,
    Analytics,
    Events,
    Reports,
    Admin,
    Settings,
}

impl ViewId {
    /// Every view, in sidebar order.
    pub const ALL: [ViewId; 11] = [
        ViewId::Dashboard,
        ViewId::Network,
        ViewId::Application,
        ViewId::Hardware,
        ViewId::Logs,
        ViewId::Risks,
        ViewId::Analytics,
        ViewId::Events,
        ViewId::Reports,
        ViewId::Admin,
        ViewId::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Network => "network",
            Self::Application => "application",
            Self::Hardware => "hardware",
            Self::Logs => "logs",
            Self::Risks => "risks",
            Self::Analytics => "analytics",
            Self::Events => "events",
            Self::Reports => "reports",
            Self::Admin => "admin",
            Self::Settings => "settings",
        }
    }

    /// Human-readable sidebar label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dashboard => "Overview",
            Self::Network => "Network Security",
            Self::Application => "Application Security",
            Self::Hardware => "Hardware Health",
            Self::Logs => "System Logs",
            Self::Risks => "Risk Management",
            Self::Analytics => "User Analytics",
            Self::Events => "Security Events",
            Self::Reports => "Reports",
            Self::Admin => "Administration",
            Self::Settings => "Settings",
        }
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ViewId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ViewId::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| format!("unknown view '{s}'"))
    }
}

/// Static description of a view: where it reads from and, optionally,
/// its own polling cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub id: ViewId,
    /// Endpoint path relative to the API base. `None` for static panels.
    pub endpoint: Option<String>,
    /// Replaces the shared interval for this view when set.
    pub poll_interval_override: Option<Duration>,
}

impl ViewDescriptor {
    pub fn polled(id: ViewId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: Some(endpoint.into()),
            poll_interval_override: None,
        }
    }

    pub fn static_panel(id: ViewId) -> Self {
        Self {
            id,
            endpoint: None,
            poll_interval_override: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_override = Some(interval);
        self
    }

    pub fn is_polled(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// The set of views the dashboard can show, in navigation order.
#[derive(Debug, Clone)]
pub struct ViewCatalog {
    views: Vec<ViewDescriptor>,
}

impl ViewCatalog {
    pub fn new(views: Vec<ViewDescriptor>) -> Self {
        Self { views }
    }

    pub fn get(&self, id: ViewId) -> Option<&ViewDescriptor> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewDescriptor> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// The view after `id`, wrapping around. `id` itself if it is not listed.
    pub fn next_after(&self, id: ViewId) -> ViewId {
        self.step(id, 1)
    }

    /// The view before `id`, wrapping around.
    pub fn previous_before(&self, id: ViewId) -> ViewId {
        self.step(id, self.views.len().saturating_sub(1))
    }

    fn step(&self, id: ViewId, offset: usize) -> ViewId {
        match self.views.iter().position(|v| v.id == id) {
            Some(pos) => self.views[(pos + offset) % self.views.len()].id,
            None => id,
        }
    }
}

impl Default for ViewCatalog {
    fn default() -> Self {
        let legacy = Duration::from_millis(5000);
        Self::new(vec![
            ViewDescriptor::polled(ViewId::Dashboard, "/dashboard/stats"),
            ViewDescriptor::polled(ViewId::Network, "/dashboard/network-stats"),
            ViewDescriptor::polled(ViewId::Application, "/dashboard/app-stats"),
            ViewDescriptor::polled(ViewId::Hardware, "/dashboard/hardware-stats"),
            ViewDescriptor::polled(ViewId::Logs, "/dashboard/stats"),
            ViewDescriptor::polled(ViewId::Risks, "/dashboard/stats").with_poll_interval(legacy),
            ViewDescriptor::polled(ViewId::Analytics, "/dashboard/stats")
                .with_poll_interval(legacy),
            ViewDescriptor::polled(ViewId::Events, "/dashboard/stats").with_poll_interval(legacy),
            ViewDescriptor::static_panel(ViewId::Reports),
            ViewDescriptor::static_panel(ViewId::Admin),
            ViewDescriptor::static_panel(ViewId::Settings),
        ])
    }
}
