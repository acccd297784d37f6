// SPDX-License-Identifier: Apache-2.0

//! Tile polling with retry and termination.
//!
//! [`TilePoller`] keeps catalog tiles fresh. After [`TilePoller::start`] it
//! waits out a debounce window, then fetches the requested resource once
//! per update period. Failed fetches are retried with linear backoff; a
//! small set of statuses ends the session instead. Everything the session
//! produces arrives on the [`PollEvents`] receiver returned by
//! [`TilePoller::new`].
//!
//! # Session lifecycle
//!
//! ```text
//! Idle/Terminated --start--> Debouncing --window--> Polling
//! Polling --retryable failure--> RetryWaiting --delay--> Polling
//! RetryWaiting --retries exhausted--> Terminated
//! Polling/RetryWaiting --terminating error--> Terminated
//! any --stop--> Idle
//! ```
//!
//! Ticks that fall due while a fetch or its retries are outstanding are
//! dropped, so at most one request is in flight per poller.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use tilewatch_core::{CatalogEndpoints, MockTransport, PollEvent, PollerSettings, TilePoller};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = MockTransport::new();
//! transport.push_payload(json!([{"id": "apicatalog", "status": "UP"}]));
//!
//! let endpoints = CatalogEndpoints::new("https://localhost:10010").unwrap();
//! let (poller, mut events) =
//!     TilePoller::new(Arc::new(transport), endpoints, PollerSettings::default());
//!
//! poller.start(None);
//! if let Some(PollEvent::Success { tiles }) = events.recv().await {
//!     assert_eq!(tiles[0].id.as_deref(), Some("apicatalog"));
//! }
//! poller.stop();
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::Retryable;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, PollError};
use crate::retry::RetryPolicy;
use crate::tile::{PollRequest, Tile, decode_tiles};
use crate::transport::{CatalogEndpoints, FetchRequest, TileTransport};

/// Timing and retry settings, fixed for the poller's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct PollerSettings {
    /// Time between the starts of successive fetch cycles.
    #[builder(default = Duration::from_secs(30))]
    pub update_period: Duration,
    /// Quiet period after the latest `start` before the first fetch.
    #[builder(default = Duration::from_millis(300))]
    pub debounce_window: Duration,
    /// Retry classification and backoff.
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Something a polling session reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PollEvent {
    /// A fetch cycle returned tiles.
    Success {
        /// Tiles from the catalog, never empty.
        tiles: Vec<Tile>,
    },
    /// A fetch failed and retry `attempt` of `max_retries` is scheduled.
    ///
    /// Sent only before a retry that will actually run, so a cycle reports
    /// at most `max_retries` of these. When the last allowed retry fails
    /// the session ends with [`PollError::RetriesExhausted`] instead of a
    /// further `Retrying`.
    Retrying {
        /// 1-based retry number.
        attempt: u32,
        /// Retries allowed per cycle.
        max_retries: u32,
    },
    /// The session ended with an error.
    Failure {
        /// Why the session ended.
        error: PollError,
    },
    /// The session ended on a 401 or 403.
    AuthenticationFailure {
        /// The rejected request's error.
        error: FetchError,
    },
    /// `stop()` ended an active session.
    Stopped,
}

impl PollEvent {
    /// True for events after which the session produces nothing more.
    #[must_use]
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            PollEvent::Failure { .. } | PollEvent::AuthenticationFailure { .. } | PollEvent::Stopped
        )
    }
}

/// Where the poller is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    /// No session.
    #[default]
    Idle,
    /// Waiting out the debounce window.
    Debouncing,
    /// Fetching, or waiting for the next tick.
    Polling,
    /// Waiting before a retry.
    RetryWaiting,
    /// The last session ended on its own.
    Terminated,
}

/// Receiving half of a poller's event stream.
///
/// Yields `None` once the poller is dropped and its session has wound down.
#[derive(Debug)]
pub struct PollEvents {
    rx: mpsc::UnboundedReceiver<PollEvent>,
}

impl PollEvents {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<PollEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<PollEvent> {
        self.rx.try_recv().ok()
    }
}

/// Polls the API Catalog for tiles.
///
/// Must be used from within a Tokio runtime; each session runs as a
/// spawned task. Dropping the poller cancels its session silently.
pub struct TilePoller {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn TileTransport>,
    endpoints: CatalogEndpoints,
    settings: PollerSettings,
    events: mpsc::UnboundedSender<PollEvent>,
    state: Mutex<ControllerState>,
}

#[derive(Default)]
struct ControllerState {
    phase: PollerState,
    session: Option<Session>,
    next_id: u64,
}

struct Session {
    id: u64,
    token: CancellationToken,
}

impl ControllerState {
    fn is_current(&self, id: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }
}

impl TilePoller {
    /// Create a poller and the receiver for its events.
    pub fn new(
        transport: Arc<dyn TileTransport>,
        endpoints: CatalogEndpoints,
        settings: PollerSettings,
    ) -> (Self, PollEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            transport,
            endpoints,
            settings,
            events: tx,
            state: Mutex::new(ControllerState::default()),
        });
        (Self { shared }, PollEvents { rx })
    }

    /// Start polling `resource_id`, or every tile when `None` or empty.
    ///
    /// Supersedes any current session. Starts that arrive within the
    /// debounce window of each other collapse into one session for the
    /// latest id.
    pub fn start(&self, resource_id: Option<&str>) {
        let request = PollRequest::new(resource_id);
        let token = CancellationToken::new();

        let id = {
            let mut state = self.shared.state.lock();
            if let Some(previous) = state.session.take() {
                previous.token.cancel();
            }
            state.next_id += 1;
            let id = state.next_id;
            state.session = Some(Session {
                id,
                token: token.clone(),
            });
            state.phase = PollerState::Debouncing;
            id
        };

        info!(session = id, resource_id = ?request.resource_id, "Starting tile polling");
        tokio::spawn(run_session(Arc::clone(&self.shared), id, request, token));
    }

    /// Stop the current session.
    ///
    /// Pending timers are cancelled and an in-flight fetch is abandoned; no
    /// event from the session is delivered after this returns. Emits
    /// [`PollEvent::Stopped`] if a session was active. Idempotent.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.phase = PollerState::Idle;
        if let Some(session) = state.session.take() {
            session.token.cancel();
            info!(session = session.id, "Stopped tile polling");
            let _ = self.shared.events.send(PollEvent::Stopped);
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PollerState {
        self.shared.state.lock().phase
    }

    /// Settings this poller was built with.
    #[must_use]
    pub fn settings(&self) -> &PollerSettings {
        &self.shared.settings
    }
}

impl Drop for TilePoller {
    fn drop(&mut self) {
        if let Some(session) = self.shared.state.lock().session.take() {
            session.token.cancel();
        }
    }
}

impl Shared {
    fn set_phase(&self, id: u64, phase: PollerState) {
        let mut state = self.state.lock();
        if state.is_current(id) {
            state.phase = phase;
        }
    }

    /// Deliver an event if session `id` is still current.
    ///
    /// The check and the send happen under the lock `stop()` takes, so a
    /// retired session can never slip an event in after it.
    fn emit(&self, id: u64, event: PollEvent) -> bool {
        let mut state = self.state.lock();
        if !state.is_current(id) {
            return false;
        }
        if self.events.send(event).is_err() {
            debug!(session = id, "Event receiver dropped, ending session");
            if let Some(session) = state.session.take() {
                session.token.cancel();
            }
            state.phase = PollerState::Idle;
            return false;
        }
        true
    }

    /// Deliver a terminal event and retire session `id`.
    fn finish(&self, id: u64, event: PollEvent) {
        let mut state = self.state.lock();
        if !state.is_current(id) {
            return;
        }
        let _ = self.events.send(event);
        state.phase = PollerState::Terminated;
        if let Some(session) = state.session.take() {
            session.token.cancel();
        }
    }

    /// Run one fetch cycle, including its retries.
    ///
    /// Returns the terminal event if the cycle ends the session.
    async fn run_cycle(
        &self,
        id: u64,
        request: &PollRequest,
        fetch: &FetchRequest,
    ) -> Option<PollEvent> {
        let policy: &RetryPolicy = &self.settings.retry;
        let attempts = AtomicU32::new(0);

        let result = {
            let transport = &self.transport;
            let attempts = &attempts;
            (|| async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                self.set_phase(id, PollerState::Polling);
                debug!(session = id, attempt, url = %fetch.url, "Fetching tiles");
                let response = transport.fetch(fetch).await?;
                decode_tiles(response.payload).map_err(|e| {
                    FetchError::status(
                        response.status,
                        format!("Unexpected API Catalog payload: {e}"),
                    )
                })
            })
            .retry(policy.backoff())
            .when(|err: &FetchError| !policy.should_terminate(err))
            .notify(|err: &FetchError, delay: Duration| {
                let attempt = attempts.load(Ordering::SeqCst);
                warn!(
                    session = id,
                    attempt,
                    max_retries = policy.max_retries,
                    status = ?err.http_status,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Request to display tiles failed, retrying"
                );
                self.set_phase(id, PollerState::RetryWaiting);
                self.emit(
                    id,
                    PollEvent::Retrying {
                        attempt,
                        max_retries: policy.max_retries,
                    },
                );
            })
            .await
        };

        match result {
            Ok(tiles) if tiles.is_empty() => {
                debug!(session = id, "Catalog returned no tiles");
                Some(PollEvent::Failure {
                    error: PollError::NotFound {
                        resource_id: request.resource_id.clone(),
                    },
                })
            }
            Ok(tiles) => {
                debug!(session = id, count = tiles.len(), "Fetched tiles");
                self.emit(id, PollEvent::Success { tiles });
                None
            }
            Err(err) if policy.should_terminate(&err) => {
                warn!(session = id, status = ?err.http_status, error = %err, "Tile polling terminated");
                if err.is_authentication() {
                    Some(PollEvent::AuthenticationFailure { error: err })
                } else {
                    Some(PollEvent::Failure {
                        error: PollError::Terminated(err),
                    })
                }
            }
            Err(err) => {
                let attempts = attempts.load(Ordering::SeqCst);
                error!(session = id, attempts, error = %err, "Request to display tiles failed");
                Some(PollEvent::Failure {
                    error: PollError::RetriesExhausted { attempts, last: err },
                })
            }
        }
    }
}

async fn run_session(shared: Arc<Shared>, id: u64, request: PollRequest, token: CancellationToken) {
    tokio::select! {
        () = token.cancelled() => return,
        () = tokio::time::sleep(shared.settings.debounce_window) => {}
    }

    shared.set_phase(id, PollerState::Polling);
    let fetch = FetchRequest::get(shared.endpoints.containers_url(&request));

    let period = shared.settings.update_period.max(Duration::from_millis(1));
    let mut busy_until = Instant::now();
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let scheduled = tokio::select! {
            () = token.cancelled() => return,
            scheduled = ticks.tick() => scheduled,
        };
        // Interval still yields one overdue tick after a long cycle.
        if scheduled < busy_until {
            continue;
        }

        let outcome = tokio::select! {
            () = token.cancelled() => return,
            outcome = shared.run_cycle(id, &request, &fetch) => outcome,
        };
        busy_until = Instant::now();

        if let Some(event) = outcome {
            shared.finish(id, event);
            return;
        }
    }
}
