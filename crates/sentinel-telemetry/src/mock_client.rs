//! Scripted telemetry client for testing
//!
//! Every fetch is parked until the test resolves it, so tests decide
//! exactly when (and in which order) responses arrive. The client also
//! keeps count of how many fetches are outstanding at once and how many
//! were dropped before they completed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::client::{FetchFuture, TelemetryClient};
use crate::{FetchError, Payload};

/// A fetch waiting for the test to supply its response.
pub struct PendingFetch {
    endpoint: String,
    call_index: usize,
    responder: oneshot::Sender<Result<Payload, FetchError>>,
}

impl PendingFetch {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Zero-based position of this call in the client's call log.
    pub fn call_index(&self) -> usize {
        self.call_index
    }

    /// Deliver the response. Returns `false` if the caller already
    /// dropped the request.
    pub fn resolve(self, result: Result<Payload, FetchError>) -> bool {
        self.responder.send(result).is_ok()
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<String>,
    pending: VecDeque<PendingFetch>,
    active: usize,
    peak_active: usize,
    cancelled: usize,
    auto_response: Option<Result<Payload, FetchError>>,
}

enum Reply {
    Immediate(Result<Payload, FetchError>),
    Deferred(oneshot::Receiver<Result<Payload, FetchError>>),
}

/// Tracks one outstanding call; dropping it before completion counts as
/// a cancellation.
struct InFlightGuard {
    script: Arc<Mutex<Script>>,
    completed: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut script = lock(&self.script);
        script.active = script.active.saturating_sub(1);
        if !self.completed {
            script.cancelled += 1;
        }
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`TelemetryClient`] whose responses are supplied by the test.
#[derive(Clone, Default)]
pub struct ScriptedTelemetryClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTelemetryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that answers every call immediately with `result`.
    pub fn responding(result: Result<Payload, FetchError>) -> Self {
        let client = Self::new();
        client.set_auto_response(Some(result));
        client
    }

    /// Switch between immediate answers (`Some`) and parked calls (`None`).
    pub fn set_auto_response(&self, result: Option<Result<Payload, FetchError>>) {
        lock(&self.script).auto_response = result;
    }

    /// Endpoints requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.script).calls.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.script).calls.len()
    }

    /// Calls currently outstanding (started, neither completed nor dropped).
    pub fn active(&self) -> usize {
        lock(&self.script).active
    }

    /// Highest number of simultaneously outstanding calls seen.
    pub fn peak_active(&self) -> usize {
        lock(&self.script).peak_active
    }

    /// Calls dropped by the caller before a response was delivered.
    pub fn cancelled(&self) -> usize {
        lock(&self.script).cancelled
    }

    /// Parked calls whose caller is still waiting.
    pub fn pending_count(&self) -> usize {
        lock(&self.script)
            .pending
            .iter()
            .filter(|p| !p.responder.is_closed())
            .count()
    }

    /// Resolve the oldest parked call that still has a waiting caller.
    pub fn resolve_next(&self, result: Result<Payload, FetchError>) -> bool {
        let next = {
            let mut script = lock(&self.script);
            loop {
                match script.pending.pop_front() {
                    Some(p) if p.responder.is_closed() => continue,
                    other => break other,
                }
            }
        };
        match next {
            Some(pending) => pending.resolve(result),
            None => false,
        }
    }

    /// Take every parked call, oldest first, for out-of-order resolution.
    pub fn take_pending(&self) -> Vec<PendingFetch> {
        lock(&self.script).pending.drain(..).collect()
    }
}

impl TelemetryClient for ScriptedTelemetryClient {
    fn fetch<'a>(&'a self, endpoint: &'a str) -> FetchFuture<'a> {
        let script = Arc::clone(&self.script);
        let endpoint = endpoint.to_string();
        Box::pin(async move {
            let reply = {
                let mut s = lock(&script);
                let call_index = s.calls.len();
                s.calls.push(endpoint.clone());
                s.active += 1;
                s.peak_active = s.peak_active.max(s.active);
                match s.auto_response.clone() {
                    Some(result) => Reply::Immediate(result),
                    None => {
                        let (tx, rx) = oneshot::channel();
                        s.pending.push_back(PendingFetch {
                            endpoint,
                            call_index,
                            responder: tx,
                        });
                        Reply::Deferred(rx)
                    }
                }
            };
            let mut guard = InFlightGuard {
                script,
                completed: false,
            };

            let result = match reply {
                Reply::Immediate(result) => result,
                Reply::Deferred(rx) => rx.await.unwrap_or_else(|_| {
                    Err(FetchError::Network("scripted response dropped".to_string()))
                }),
            };
            guard.completed = true;
            result
        })
    }
}
