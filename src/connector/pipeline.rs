//! Per-endpoint request pipeline.
//!
//! # Responsibilities
//! - Queue requests in send order
//! - Run at most one drain task per connector
//! - Bound simultaneous transfers through shared transfer slots
//! - Enforce the per-transfer timeout and classify the outcome
//! - Deliver exactly one `Response` per accepted request
//!
//! # State Machine
//! ```text
//! IDLE --send()--> DRAINING (spawns drain task)
//! DRAINING --send()--> DRAINING (request appended, no new task)
//! DRAINING --queue empty--> IDLE
//! ```
//!
//! # Design Decisions
//! - One connector is one serial pipeline: issue order and callback order
//!   both match send order
//! - Failures never stop the drain loop and are never retried
//! - Callbacks run on the drain task and are not caught; if one unwinds, a
//!   guard restarts draining when requests are still queued and otherwise
//!   marks the connector idle

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::time::{timeout, Instant};

use crate::connector::error::{ConnectorError, ConnectorResult};
use crate::connector::key::ConnectorKey;
use crate::http::query::build_url;
use crate::http::request::{set_header, Request};
use crate::http::response::Response;
use crate::http::transport::{Transfer, TransferError, Transport};
use crate::observability::metrics;

/// Basic auth credentials attached to every request of a connector.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Static settings of a connector.
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Prefix of every request URL.
    pub base_url: String,
    /// Credentials for the `Authorization` header.
    pub auth: Option<BasicAuth>,
    /// Headers applied to every request, overriding request headers.
    pub extra_headers: Vec<(String, String)>,
    /// Connector routes through the gateway.
    pub using_gateway: bool,
    /// Maximum wait for a single transfer.
    pub timeout: Duration,
    /// Maximum simultaneous transfers.
    pub max_concurrent: usize,
}

impl ConnectorSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            extra_headers: Vec::new(),
            using_gateway: false,
            timeout: Duration::from_secs(30),
            max_concurrent: 5,
        }
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.extra_headers, name.into(), value.into());
        self
    }

    pub fn with_gateway(mut self, using_gateway: bool) -> Self {
        self.using_gateway = using_gateway;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Request>,
    /// Running drain tasks (0 or 1).
    active: usize,
}

/// Queues and transmits requests for one `(service, function)` pair.
pub struct Connector {
    key: ConnectorKey,
    settings: ConnectorSettings,
    transport: Arc<dyn Transport>,
    slots: Arc<Semaphore>,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl Connector {
    /// Create a standalone connector with its own transfer slots.
    pub fn new(key: ConnectorKey, settings: ConnectorSettings, transport: Arc<dyn Transport>) -> Self {
        let slots = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self::with_slots(key, settings, transport, slots)
    }

    /// Create a connector sharing transfer slots with other connectors.
    pub fn with_slots(
        key: ConnectorKey,
        settings: ConnectorSettings,
        transport: Arc<dyn Transport>,
        slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            key,
            settings,
            transport,
            slots,
            state: Mutex::new(QueueState::default()),
            idle: Notify::new(),
        }
    }

    /// Queue a request for transmission.
    ///
    /// `Ok(())` means the request was accepted into the queue; the outcome is
    /// delivered later through its callback. Spawns a drain task if none is
    /// running, so this must be called from within a Tokio runtime.
    pub fn send(self: &Arc<Self>, request: Request) -> ConnectorResult<()> {
        validate_headers(&request)?;

        let spawn = {
            let mut state = self.lock_state();
            state.pending.push_back(request);
            metrics::record_queue_depth(&self.key.to_string(), state.pending.len());
            if state.active == 0 {
                state.active = 1;
                true
            } else {
                false
            }
        };

        if spawn {
            tracing::trace!(connector = %self.key, "Starting drain task");
            let this = Arc::clone(self);
            tokio::spawn(async move { this.drain().await });
        }
        Ok(())
    }

    /// Queue a request and wait for its response.
    ///
    /// Replaces any callback already set on the request.
    pub async fn call(self: &Arc<Self>, mut request: Request) -> ConnectorResult<Response> {
        let (tx, rx) = oneshot::channel();
        let id = request.id();
        request.set_callback(Box::new(move |_, response| {
            let _ = tx.send(response);
        }));
        self.send(request)?;
        rx.await
            .map_err(|_| ConnectorError::ResponseDropped(id.to_string()))
    }

    pub fn key(&self) -> &ConnectorKey {
        &self.key
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub fn using_gateway(&self) -> bool {
        self.settings.using_gateway
    }

    pub fn max_concurrent(&self) -> usize {
        self.settings.max_concurrent
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    /// Number of running drain tasks.
    pub fn active_count(&self) -> usize {
        self.lock_state().active
    }

    /// Number of queued requests not yet dequeued.
    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock_state();
        state.active == 0 && state.pending.is_empty()
    }

    /// Wait until the queue is drained and no transfer is in progress.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>) {
        let mut guard = DrainGuard {
            connector: Arc::clone(&self),
            armed: true,
        };

        // Let `send` callers continue before the first transfer starts.
        tokio::task::yield_now().await;

        loop {
            let next = {
                let mut state = self.lock_state();
                let next = state.pending.pop_front();
                metrics::record_queue_depth(&self.key.to_string(), state.pending.len());
                if next.is_none() {
                    state.active = 0;
                    guard.armed = false;
                }
                next
            };

            match next {
                Some(request) => self.process(request).await,
                None => break,
            }
        }

        tracing::trace!(connector = %self.key, "Drain task finished");
        self.idle.notify_waiters();
    }

    async fn process(&self, mut request: Request) {
        let url = build_url(&self.settings.base_url, request.function(), request.parameters());
        let method = request.method();
        let transfer = Transfer {
            method,
            url: url.clone(),
            headers: self.merge_headers(&request),
            body: request.body().map(<[u8]>::to_vec),
        };

        tracing::debug!(
            connector = %self.key,
            request_id = %request.id(),
            method = %method,
            url = %url,
            "Sending request"
        );

        // Slots are never closed by this crate; a caller-closed pool only
        // lifts the bound.
        let permit = match self.slots.acquire().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(connector = %self.key, "Transfer slots closed, sending without a slot");
                None
            }
        };
        let start = Instant::now();
        let outcome = timeout(self.settings.timeout, self.transport.execute(transfer)).await;
        let elapsed_secs = start.elapsed().as_secs_f64();
        drop(permit);

        let response = match outcome {
            Ok(Ok(reply)) if (200..300).contains(&reply.status) => {
                Response::succeeded(reply.status, reply.body, elapsed_secs)
            }
            Ok(Ok(reply)) => {
                let partial = String::from_utf8_lossy(&reply.body);
                Response::failed(
                    failure_message(&url, &TransferError::Status(reply.status), &partial),
                    Some(reply.status),
                    elapsed_secs,
                )
            }
            Ok(Err(e)) => Response::failed(failure_message(&url, &e, ""), None, elapsed_secs),
            Err(_) => Response::failed(
                failure_message(&url, &TransferError::Timeout, ""),
                None,
                elapsed_secs,
            ),
        };

        if response.success {
            tracing::debug!(
                connector = %self.key,
                request_id = %request.id(),
                status = ?response.status,
                elapsed_secs,
                "Request completed"
            );
        } else {
            tracing::warn!(
                connector = %self.key,
                request_id = %request.id(),
                error = %response.error,
                elapsed_secs,
                "Request failed"
            );
        }
        metrics::record_transfer(
            self.key.service_id(),
            if response.success { "success" } else { "failure" },
            elapsed_secs,
        );

        if let Some(callback) = request.take_callback() {
            callback(&request, response);
        }
    }

    /// Request headers, then `Authorization`, then connector headers.
    fn merge_headers(&self, request: &Request) -> Vec<(String, String)> {
        let mut headers = request.headers().to_vec();
        if let Some(auth) = &self.settings.auth {
            set_header(&mut headers, "Authorization".to_string(), auth.header_value());
        }
        for (name, value) in &self.settings.extra_headers {
            set_header(&mut headers, name.clone(), value.clone());
        }
        headers
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Connector")
            .field("key", &self.key)
            .field("base_url", &self.settings.base_url)
            .field("using_gateway", &self.settings.using_gateway)
            .field("active", &state.active)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Recovers the pipeline if the drain task unwinds mid-loop.
///
/// Requests still queued get a fresh drain task so each of them is
/// answered; with nothing queued the connector is marked idle.
struct DrainGuard {
    connector: Arc<Connector>,
    armed: bool,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let handle = tokio::runtime::Handle::try_current().ok();
        let mut state = self.connector.lock_state();
        let pending = state.pending.len();
        match handle {
            Some(handle) if pending > 0 => {
                // `active` stays 1: ownership passes to the new task.
                drop(state);
                tracing::warn!(connector = %self.connector.key, pending, "Drain task aborted, restarting");
                let connector = Arc::clone(&self.connector);
                handle.spawn(async move { connector.drain().await });
            }
            _ => {
                state.active = 0;
                drop(state);
                tracing::warn!(connector = %self.connector.key, pending, "Drain task aborted");
                self.connector.idle.notify_waiters();
            }
        }
    }
}

fn validate_headers(request: &Request) -> ConnectorResult<()> {
    for (name, value) in request.headers() {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConnectorError::InvalidArgument(format!("invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConnectorError::InvalidArgument(format!("invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}

fn failure_message(url: &str, error: &TransferError, partial: &str) -> String {
    format!("URL: {}, Error: {}, Response: {}", url, error, partial)
}
