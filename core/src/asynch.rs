//! Asynchronous client: non-blocking operations dispatched on the client's
//! own event-processing context.
//!
//! # Design
//! `AsyncDashku` owns a dedicated thread running a current-thread tokio
//! runtime — the client's single-threaded event context. Operations build
//! their request up front, enqueue a `Job` over an mpsc channel and return a
//! [`Completion`] immediately; the dispatcher issues the HTTP call over a
//! shared pooled `reqwest::Client`, enforces the deadline computed at
//! submission time, and fulfills the completion from its own context — never
//! the caller's thread.
//!
//! Each request moves through `Created → Sent → (Completed | Failed |
//! TimedOut)`, reaching exactly one terminal state; failures are always
//! delivered, never swallowed, and nothing is retried automatically.
//!
//! `dispose` closes the job channel: new submissions fail with `Disposed`
//! and in-flight or queued requests are abandoned, resolving their
//! completions with `Disposed`. Disposal is idempotent and `Drop` disposes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::api::DashkuApi;
use crate::completion::{Completion, TransportResult};
use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::domain::{Dashboard, Transmission, Widget};
use crate::error::DashkuError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Lifecycle of one dispatched request. `Created` precedes `Sent`, which
/// precedes exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Sent,
    Completed,
    Failed,
    TimedOut,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Failed | RequestState::TimedOut
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        match (self, next) {
            (RequestState::Created, RequestState::Sent) => true,
            (RequestState::Sent, next) => next.is_terminal(),
            _ => false,
        }
    }
}

struct RequestLifecycle {
    id: u64,
    state: RequestState,
}

impl RequestLifecycle {
    fn new(id: u64, request: &HttpRequest) -> Self {
        debug!(request = id, path = %request.path, "request created");
        Self {
            id,
            state: RequestState::Created,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(self.state.can_transition_to(next));
        debug!(request = self.id, from = ?self.state, to = ?next, "request state");
        self.state = next;
    }
}

struct Job {
    lifecycle: RequestLifecycle,
    request: HttpRequest,
    deadline: Instant,
    reply: oneshot::Sender<TransportResult>,
}

/// Non-blocking client bound to one api key, host and port.
pub struct AsyncDashku {
    api: DashkuApi,
    config: ClientConfig,
    timeout_ms: AtomicU64,
    next_request_id: AtomicU64,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl AsyncDashku {
    /// Build the client and spawn its event-processing thread.
    pub fn new(config: ClientConfig) -> Result<Self, DashkuError> {
        let http = reqwest::Client::builder()
            .connect_timeout(DEFAULT_TIMEOUT)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(|e| DashkuError::Configuration(format!("failed to build http client: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name(format!("dashku-{}-{}", config.host(), config.port()))
            .spawn(move || dispatch(http, rx))
            .map_err(|e| {
                DashkuError::Configuration(format!("failed to spawn dispatcher: {e}"))
            })?;

        Ok(Self {
            api: DashkuApi::from_config(&config),
            timeout_ms: AtomicU64::new(config.timeout().as_millis() as u64),
            next_request_id: AtomicU64::new(1),
            jobs: Mutex::new(Some(tx)),
            config,
        })
    }

    pub fn api_key(&self) -> &str {
        self.config.api_key()
    }

    pub fn host(&self) -> &str {
        self.config.host()
    }

    pub fn port(&self) -> u16 {
        self.config.port()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    /// Adjust the request timeout. Applies to subsequent submissions only;
    /// requests already in flight keep their original deadline.
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    /// Release the event context and its pooled connections. Idempotent.
    ///
    /// Operations issued afterwards fail with `Disposed`; queued and
    /// in-flight requests are abandoned and their completions resolve with
    /// `Disposed`.
    pub fn dispose(&self) {
        if self.jobs.lock().take().is_some() {
            debug!(host = self.config.host(), port = self.config.port(), "client disposed");
        }
    }

    // --- dashboards ---

    pub fn get_dashboards(&self) -> Completion<Vec<Dashboard>> {
        let api = self.api.clone();
        self.submit(Ok(self.api.build_get_dashboards()), move |response| {
            api.parse_dashboards(response)
        })
    }

    pub fn get_dashboard(&self, dashboard_id: &str) -> Completion<Dashboard> {
        let api = self.api.clone();
        self.submit(Ok(self.api.build_get_dashboard(dashboard_id)), move |response| {
            api.parse_dashboard(response)
        })
    }

    /// Create `dashboard` on the server. The completion yields the
    /// server-authoritative object — id and timestamps assigned, dirty set
    /// clean. The argument is consumed; the instance handed back replaces it.
    pub fn create_dashboard(&self, dashboard: Dashboard) -> Completion<Dashboard> {
        let request = self.api.build_create_dashboard(&dashboard);
        let api = self.api.clone();
        self.submit(request, move |response| api.parse_created_dashboard(response))
    }

    /// Send the dirty fields of `dashboard`; the completion yields the
    /// server's updated copy with a clean dirty set.
    pub fn update_dashboard(&self, dashboard: Dashboard) -> Completion<Dashboard> {
        let request = self.api.build_update_dashboard(&dashboard);
        let api = self.api.clone();
        self.submit(request, move |response| api.parse_updated_dashboard(response))
    }

    pub fn delete_dashboard(&self, dashboard_id: &str) -> Completion<()> {
        let api = self.api.clone();
        self.submit(Ok(self.api.build_delete_dashboard(dashboard_id)), move |response| {
            api.parse_deleted(response)
        })
    }

    /// Fire-and-forget push of a JSON object to a dashboard.
    pub fn transmit(&self, dashboard_id: &str, transmission: &Transmission) -> Completion<()> {
        let request = self.api.build_transmit(dashboard_id, transmission);
        let api = self.api.clone();
        self.submit(request, move |response| api.parse_transmitted(response))
    }

    // --- widgets ---

    pub fn create_widget(&self, dashboard_id: &str, widget: Widget) -> Completion<Widget> {
        let request = self.api.build_create_widget(dashboard_id, &widget);
        let api = self.api.clone();
        self.submit(request, move |response| api.parse_created_widget(response))
    }

    pub fn update_widget(&self, dashboard_id: &str, widget: Widget) -> Completion<Widget> {
        let request = self.api.build_update_widget(dashboard_id, &widget);
        let api = self.api.clone();
        self.submit(request, move |response| api.parse_updated_widget(response))
    }

    pub fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> Completion<()> {
        let api = self.api.clone();
        self.submit(
            Ok(self.api.build_delete_widget(dashboard_id, widget_id)),
            move |response| api.parse_deleted(response),
        )
    }

    /// Enqueue one request on the event context and hand back its completion.
    fn submit<T, D>(&self, request: Result<HttpRequest, DashkuError>, decode: D) -> Completion<T>
    where
        D: FnOnce(HttpResponse) -> Result<T, DashkuError> + Send + 'static,
    {
        let request = match request {
            Ok(request) => request,
            Err(err) => return Completion::failed(err),
        };
        let jobs = self.jobs.lock();
        let Some(tx) = jobs.as_ref() else {
            return Completion::failed(DashkuError::Disposed);
        };

        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let timeout = self.timeout();
        let (reply, rx) = oneshot::channel();
        let job = Job {
            lifecycle: RequestLifecycle::new(id, &request),
            request,
            deadline: Instant::now() + timeout,
            reply,
        };
        if let Err(rejected) = tx.send(job) {
            // Dispatcher already gone; fail the completion we hand back.
            let _ = rejected.0.reply.send(Err(DashkuError::Disposed));
        }
        Completion::new(rx, Box::new(decode))
    }
}

impl Drop for AsyncDashku {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Event loop: one current-thread runtime per client, all requests as local
/// tasks so responses are delivered from this context in arrival order.
fn dispatch(http: reqwest::Client, mut jobs: mpsc::UnboundedReceiver<Job>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            warn!(error = %err, "event context failed to start");
            jobs.close();
            return;
        }
    };
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        while let Some(job) = jobs.recv().await {
            let http = http.clone();
            tokio::task::spawn_local(run_job(http, job));
        }
    });
    // Dropping the LocalSet abandons any request still in flight; its
    // completion resolves with `Disposed`.
}

async fn run_job(http: reqwest::Client, job: Job) {
    let Job {
        mut lifecycle,
        request,
        deadline,
        reply,
    } = job;

    // An already-elapsed deadline fails without touching the network.
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        lifecycle.advance(RequestState::TimedOut);
        let _ = reply.send(Err(DashkuError::Timeout));
        return;
    }

    lifecycle.advance(RequestState::Sent);
    match tokio::time::timeout(remaining, execute(&http, request)).await {
        Err(_) => {
            lifecycle.advance(RequestState::TimedOut);
            let _ = reply.send(Err(DashkuError::Timeout));
        }
        Ok(Err(err)) => {
            lifecycle.advance(RequestState::Failed);
            let _ = reply.send(Err(err));
        }
        Ok(Ok(response)) => {
            lifecycle.advance(RequestState::Completed);
            if reply.send(Ok(response)).is_err() {
                debug!(request = lifecycle.id, "completion dropped before delivery");
            }
        }
    }
}

async fn execute(http: &reqwest::Client, request: HttpRequest) -> TransportResult {
    let method = match request.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };
    let mut builder = http.request(method, &request.path);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(map_reqwest)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response.text().await.map_err(map_reqwest)?;

    let decoded = HttpResponse {
        status,
        headers,
        body,
    };
    debug!("{}", decoded.render());
    Ok(decoded)
}

fn map_reqwest(err: reqwest::Error) -> DashkuError {
    if err.is_timeout() {
        DashkuError::Timeout
    } else {
        DashkuError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AsyncDashku {
        AsyncDashku::new(ClientConfig::new("k1", "dashku", 3000).unwrap()).unwrap()
    }

    #[test]
    fn request_state_reaches_one_terminal_state() {
        assert!(RequestState::Created.can_transition_to(RequestState::Sent));
        assert!(RequestState::Sent.can_transition_to(RequestState::Completed));
        assert!(RequestState::Sent.can_transition_to(RequestState::Failed));
        assert!(RequestState::Sent.can_transition_to(RequestState::TimedOut));

        // No terminal state has successors, and Sent cannot repeat.
        for terminal in [
            RequestState::Completed,
            RequestState::Failed,
            RequestState::TimedOut,
        ] {
            assert!(terminal.is_terminal());
            for next in [RequestState::Created, RequestState::Sent, terminal] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!RequestState::Created.can_transition_to(RequestState::Completed));
        assert!(!RequestState::Sent.can_transition_to(RequestState::Sent));
    }

    #[test]
    fn dispose_is_idempotent_and_rejects_new_work() {
        let client = client();
        client.dispose();
        client.dispose();
        let err = client.get_dashboards().wait().unwrap_err();
        assert!(matches!(err, DashkuError::Disposed));
    }

    #[test]
    fn elapsed_deadline_times_out_without_network() {
        // The host is unresolvable; a request that touched the network would
        // surface a transport failure instead.
        let client = client();
        client.set_timeout(Duration::ZERO);
        let err = client.get_dashboards().wait().unwrap_err();
        assert!(matches!(err, DashkuError::Timeout));
    }

    #[test]
    fn timeout_adjustment_applies_to_later_submissions() {
        let client = client();
        client.set_timeout(Duration::from_millis(50));
        assert_eq!(client.timeout(), Duration::from_millis(50));
    }

    #[test]
    fn build_failure_resolves_completion_immediately() {
        let client = client();
        let mut dashboard = Dashboard::new();
        dashboard.set_name("never created");
        let err = client.update_dashboard(dashboard).wait().unwrap_err();
        assert!(matches!(err, DashkuError::Configuration(_)));
    }
}
