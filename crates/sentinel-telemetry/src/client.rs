//! Telemetry client: one request to one named endpoint.
//!
//! The client performs a single network read and hands back either a
//! parsed [`Payload`] or a tagged [`FetchError`]. It never retries,
//! never touches shared state and knows nothing about polling cadence;
//! all of that belongs to the poller driving it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::{FetchError, Payload};

/// Base URL of the monitoring API when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Boxed future returned by [`TelemetryClient::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Payload, FetchError>> + Send + 'a>>;

/// Trait for telemetry backends, abstracting the transport.
///
/// The HTTP implementation talks to the monitoring API; tests plug in
/// [`ScriptedTelemetryClient`](crate::ScriptedTelemetryClient) to control
/// exactly when each request resolves.
pub trait TelemetryClient: Send + Sync {
    /// Fetch the endpoint once.
    fn fetch<'a>(&'a self, endpoint: &'a str) -> FetchFuture<'a>;
}

/// [`TelemetryClient`] over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpTelemetryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTelemetryClient {
    /// Create a client for `base_url`.
    ///
    /// `timeout` bounds each request; `None` lets a hung request stay
    /// outstanding until the poller abandons it.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.into(),
            http: builder.build().unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path, joined with exactly one `/`.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn get_json(&self, endpoint: &str) -> Result<Payload, FetchError> {
        let url = self.url_for(endpoint);
        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Network(format!("request to {url} timed out"))
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Protocol {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("reading body: {e}")))?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::trace!(url = %url, bytes = body.len(), "Fetched telemetry payload");
        Ok(Payload::new(value))
    }
}

impl Default for HttpTelemetryClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn fetch<'a>(&'a self, endpoint: &'a str) -> FetchFuture<'a> {
        Box::pin(self.get_json(endpoint))
    }
}
