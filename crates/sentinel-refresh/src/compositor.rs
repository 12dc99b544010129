//! View compositor
//!
//! Tracks which view is on screen and owns the single poll session that
//! feeds it. Switching views tears the outgoing session down before the
//! incoming one is mounted, so a late response can never be rendered
//! under the wrong view.

use std::sync::Arc;

use sentinel_telemetry::{TelemetryClient, ViewCatalog, ViewId};

use crate::poller::{SessionSnapshot, ViewPoller};
use crate::settings::RefreshSettings;
use crate::RefreshError;

/// The active view paired with that view's own session.
#[derive(Debug, Clone)]
pub struct CompositorSnapshot {
    pub view: ViewId,
    /// `None` for static panels.
    pub session: Option<SessionSnapshot>,
}

pub struct Compositor {
    catalog: ViewCatalog,
    client: Arc<dyn TelemetryClient>,
    settings: Arc<RefreshSettings>,
    active: ViewId,
    session: Option<ViewPoller>,
}

impl Compositor {
    /// Start on the dashboard overview.
    pub fn new(
        catalog: ViewCatalog,
        client: Arc<dyn TelemetryClient>,
        settings: Arc<RefreshSettings>,
    ) -> Result<Self, RefreshError> {
        Self::with_initial_view(catalog, client, settings, ViewId::Dashboard)
    }

    pub fn with_initial_view(
        catalog: ViewCatalog,
        client: Arc<dyn TelemetryClient>,
        settings: Arc<RefreshSettings>,
        initial: ViewId,
    ) -> Result<Self, RefreshError> {
        let mut compositor = Self {
            catalog,
            client,
            settings,
            active: initial,
            session: None,
        };
        compositor.session = compositor.mount(initial)?;
        Ok(compositor)
    }

    pub fn active_view(&self) -> ViewId {
        self.active
    }

    pub fn catalog(&self) -> &ViewCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Arc<RefreshSettings> {
        &self.settings
    }

    /// Make `view` the active view. Returns `Ok(false)` when it already is.
    pub fn select_view(&mut self, view: ViewId) -> Result<bool, RefreshError> {
        if !self.catalog.contains(view) {
            return Err(RefreshError::UnknownView(view));
        }
        if view == self.active {
            return Ok(false);
        }

        if let Some(outgoing) = self.session.take() {
            outgoing.stop();
        }
        tracing::info!(from = %self.active, to = %view, "View selected");
        self.active = view;
        self.session = self.mount(view)?;
        Ok(true)
    }

    pub fn next_view(&mut self) -> Result<ViewId, RefreshError> {
        let next = self.catalog.next_after(self.active);
        self.select_view(next)?;
        Ok(next)
    }

    pub fn previous_view(&mut self) -> Result<ViewId, RefreshError> {
        let previous = self.catalog.previous_before(self.active);
        self.select_view(previous)?;
        Ok(previous)
    }

    /// Ask the active session for an out-of-band fetch.
    pub fn refresh_now(&self) -> bool {
        self.session.as_ref().is_some_and(ViewPoller::refresh_now)
    }

    pub fn snapshot(&self) -> CompositorSnapshot {
        CompositorSnapshot {
            view: self.active,
            session: self.session.as_ref().map(ViewPoller::snapshot),
        }
    }

    fn mount(&self, view: ViewId) -> Result<Option<ViewPoller>, RefreshError> {
        let descriptor = self
            .catalog
            .get(view)
            .ok_or(RefreshError::UnknownView(view))?;
        if !descriptor.is_polled() {
            return Ok(None);
        }
        let poller = ViewPoller::mount(descriptor.clone(), Arc::clone(&self.client), &self.settings)?;
        Ok(Some(poller))
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("active", &self.active)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_telemetry::{Payload, ScriptedTelemetryClient, ViewDescriptor};
    use serde_json::json;

    fn compositor(client: &ScriptedTelemetryClient) -> Compositor {
        Compositor::new(
            ViewCatalog::default(),
            Arc::new(client.clone()),
            Arc::new(RefreshSettings::default()),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn starts_on_dashboard_with_a_session() {
        let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
        let compositor = compositor(&client);

        let snap = compositor.snapshot();
        assert_eq!(snap.view, ViewId::Dashboard);
        let session = snap.session.unwrap();
        assert_eq!(session.view, ViewId::Dashboard);
        assert!(session.active);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_same_view_is_noop() {
        let client = ScriptedTelemetryClient::new();
        let mut compositor = compositor(&client);
        let generation = compositor.snapshot().session.unwrap().generation;

        assert!(!compositor.select_view(ViewId::Dashboard).unwrap());
        assert_eq!(compositor.snapshot().session.unwrap().generation, generation);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_view_leaves_session_alone() {
        let client = ScriptedTelemetryClient::new();
        let catalog = ViewCatalog::new(vec![
            ViewDescriptor::polled(ViewId::Dashboard, "/dashboard/stats"),
            ViewDescriptor::polled(ViewId::Network, "/dashboard/network-stats"),
        ]);
        let mut compositor = Compositor::new(
            catalog,
            Arc::new(client.clone()),
            Arc::new(RefreshSettings::default()),
        )
        .unwrap();

        let err = compositor.select_view(ViewId::Hardware).unwrap_err();
        assert_eq!(err, RefreshError::UnknownView(ViewId::Hardware));
        let snap = compositor.snapshot();
        assert_eq!(snap.view, ViewId::Dashboard);
        assert!(snap.session.unwrap().active);
    }

    #[tokio::test(start_paused = true)]
    async fn static_view_has_no_session() {
        let client = ScriptedTelemetryClient::new();
        let mut compositor = compositor(&client);

        assert!(compositor.select_view(ViewId::Settings).unwrap());
        let snap = compositor.snapshot();
        assert_eq!(snap.view, ViewId::Settings);
        assert!(snap.session.is_none());
        assert!(!compositor.refresh_now());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_wraps_around_catalog() {
        let client = ScriptedTelemetryClient::responding(Ok(Payload::new(json!({}))));
        let mut compositor = compositor(&client);

        assert_eq!(compositor.previous_view().unwrap(), ViewId::Settings);
        assert_eq!(compositor.next_view().unwrap(), ViewId::Dashboard);
        assert_eq!(compositor.next_view().unwrap(), ViewId::Network);
        assert_eq!(
            compositor.snapshot().session.unwrap().view,
            ViewId::Network
        );
    }
}
