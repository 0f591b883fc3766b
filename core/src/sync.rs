//! Blocking client for the dashboard API.
//!
//! # Design
//! `SyncDashku` executes `DashkuApi` requests over a pooled `ureq::Agent`
//! (keep-alive is the agent default) and blocks the calling thread until a
//! response arrives or the configured timeout elapses. Status interpretation
//! is disabled in the agent so non-2xx responses come back as data and the
//! `parse_*` layer owns the error mapping.
//!
//! Mutating operations take the domain object by `&mut` and merge the
//! server-authoritative result back in on success, which also clears the
//! dirty set — callers must assume the argument is mutated.
//!
//! Caller obligation: do not invoke these methods from inside an asynchronous
//! completion running on a client's event context; the block would starve the
//! dispatcher that is supposed to produce the response.

use std::time::Duration;

use tracing::debug;

use crate::api::DashkuApi;
use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::domain::{Dashboard, Transmission, Widget};
use crate::error::DashkuError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Blocking client bound to one api key, host and port.
pub struct SyncDashku {
    api: DashkuApi,
    config: ClientConfig,
    agent: ureq::Agent,
    timeout: Duration,
}

impl SyncDashku {
    pub fn new(config: ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(DEFAULT_TIMEOUT))
            .build()
            .new_agent();
        Self {
            api: DashkuApi::from_config(&config),
            timeout: config.timeout(),
            config,
            agent,
        }
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
        self.timeout
    }

    /// Adjust the request timeout. Applies to subsequent requests only.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    // --- dashboards ---

    pub fn get_dashboards(&self) -> Result<Vec<Dashboard>, DashkuError> {
        let response = self.execute(self.api.build_get_dashboards())?;
        self.api.parse_dashboards(response)
    }

    pub fn get_dashboard(&self, dashboard_id: &str) -> Result<Dashboard, DashkuError> {
        let response = self.execute(self.api.build_get_dashboard(dashboard_id))?;
        self.api.parse_dashboard(response)
    }

    /// Create `dashboard` on the server. On success the server-assigned
    /// fields (id, owner, timestamps) are merged into the argument and its
    /// dirty set is cleared.
    pub fn create_dashboard(&self, dashboard: &mut Dashboard) -> Result<(), DashkuError> {
        let request = self.api.build_create_dashboard(dashboard)?;
        let response = self.execute(request)?;
        *dashboard = self.api.parse_created_dashboard(response)?;
        Ok(())
    }

    /// Send the dirty fields of `dashboard`. On success the argument is
    /// replaced by the server's updated copy, with a clean dirty set.
    pub fn update_dashboard(&self, dashboard: &mut Dashboard) -> Result<(), DashkuError> {
        let request = self.api.build_update_dashboard(dashboard)?;
        let response = self.execute(request)?;
        *dashboard = self.api.parse_updated_dashboard(response)?;
        Ok(())
    }

    /// Delete by id. The local object (if any) is stale afterwards and must
    /// not be reused.
    pub fn delete_dashboard(&self, dashboard_id: &str) -> Result<(), DashkuError> {
        let response = self.execute(self.api.build_delete_dashboard(dashboard_id))?;
        self.api.parse_deleted(response)
    }

    /// Fire-and-forget push of a JSON object to a dashboard.
    pub fn transmit(
        &self,
        dashboard_id: &str,
        transmission: &Transmission,
    ) -> Result<(), DashkuError> {
        let request = self.api.build_transmit(dashboard_id, transmission)?;
        let response = self.execute(request)?;
        self.api.parse_transmitted(response)
    }

    // --- widgets ---

    pub fn create_widget(
        &self,
        dashboard_id: &str,
        widget: &mut Widget,
    ) -> Result<(), DashkuError> {
        let request = self.api.build_create_widget(dashboard_id, widget)?;
        let response = self.execute(request)?;
        *widget = self.api.parse_created_widget(response)?;
        Ok(())
    }

    pub fn update_widget(
        &self,
        dashboard_id: &str,
        widget: &mut Widget,
    ) -> Result<(), DashkuError> {
        let request = self.api.build_update_widget(dashboard_id, widget)?;
        let response = self.execute(request)?;
        *widget = self.api.parse_updated_widget(response)?;
        Ok(())
    }

    pub fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> Result<(), DashkuError> {
        let response = self.execute(self.api.build_delete_widget(dashboard_id, widget_id))?;
        self.api.parse_deleted(response)
    }

    /// Execute one request on the calling thread.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, DashkuError> {
        // An already-elapsed deadline fails without touching the network.
        if self.timeout.is_zero() {
            return Err(DashkuError::Timeout);
        }
        let HttpRequest {
            method,
            path,
            headers,
            body,
        } = request;
        let content_type = headers
            .iter()
            .find(|(name, _)| name == "content-type")
            .map(|(_, value)| value.clone());

        let result = match (method, body) {
            (HttpMethod::Get, _) => self
                .agent
                .get(&path)
                .config()
                .timeout_global(Some(self.timeout))
                .build()
                .call(),
            (HttpMethod::Delete, _) => self
                .agent
                .delete(&path)
                .config()
                .timeout_global(Some(self.timeout))
                .build()
                .call(),
            (HttpMethod::Post, body) => {
                let mut builder = self
                    .agent
                    .post(&path)
                    .config()
                    .timeout_global(Some(self.timeout))
                    .build();
                if let Some(ct) = &content_type {
                    builder = builder.content_type(ct.as_str());
                }
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            (HttpMethod::Put, body) => {
                let mut builder = self
                    .agent
                    .put(&path)
                    .config()
                    .timeout_global(Some(self.timeout))
                    .build();
                if let Some(ct) = &content_type {
                    builder = builder.content_type(ct.as_str());
                }
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(map_ureq)?;
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
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq)?;

        let decoded = HttpResponse {
            status,
            headers,
            body,
        };
        debug!(host = self.config.host(), "{}", decoded.render());
        Ok(decoded)
    }
}

fn map_ureq(err: ureq::Error) -> DashkuError {
    match err {
        ureq::Error::Timeout { .. } => DashkuError::Timeout,
        other => DashkuError::Transport(other.to_string()),
    }
}
