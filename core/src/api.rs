//! Stateless HTTP request builder and response parser for the dashboard API.
//!
//! # Design
//! `DashkuApi` holds only a base URL and the api key; it carries no mutable
//! state between calls. Each remote operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`, keeping request construction and status interpretation
//! independent of the transport. Mutating builders route through the
//! dirty-diff codec; creates serialize the full object.
//!
//! Every path carries the api key as a query parameter. Opaque identifiers
//! are percent-encoded into path segments.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::diff;
use crate::domain::{Dashboard, DomainObject, Transmission, Widget};
use crate::error::DashkuError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=');

const SEGMENT_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

/// Stateless request builder / response parser bound to one endpoint and api
/// key.
#[derive(Debug, Clone)]
pub struct DashkuApi {
    base_url: String,
    api_key: String,
}

impl DashkuApi {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url(), config.api_key())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?apiKey={}",
            self.base_url,
            path,
            utf8_percent_encode(&self.api_key, QUERY_ENCODE)
        )
    }

    fn segment(id: &str) -> String {
        utf8_percent_encode(id, SEGMENT_ENCODE).to_string()
    }

    // --- dashboards ---

    pub fn build_get_dashboards(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url("/dashboards"),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_get_dashboard(&self, dashboard_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url(&format!("/dashboards/{}", Self::segment(dashboard_id))),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Full-object JSON body; the server assigns the id.
    pub fn build_create_dashboard(&self, dashboard: &Dashboard) -> Result<HttpRequest, DashkuError> {
        let body = serde_json::to_string(dashboard)
            .map_err(|e| DashkuError::Encoding(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url("/dashboards"),
            headers: json_headers(),
            body: Some(body),
        })
    }

    /// Dirty-field-only JSON body.
    pub fn build_update_dashboard(&self, dashboard: &Dashboard) -> Result<HttpRequest, DashkuError> {
        let id = require_id(dashboard, "dashboard")?;
        let body = diff::dirty_update_json(dashboard)?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.url(&format!("/dashboards/{}", Self::segment(id))),
            headers: json_headers(),
            body: Some(body),
        })
    }

    /// Dirty-field-only form body, for servers that take url-encoded updates.
    pub fn build_update_dashboard_form(
        &self,
        dashboard: &Dashboard,
    ) -> Result<HttpRequest, DashkuError> {
        let id = require_id(dashboard, "dashboard")?;
        let body = diff::dirty_update_form(dashboard)?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.url(&format!("/dashboards/{}", Self::segment(id))),
            headers: form_headers(),
            body: Some(body),
        })
    }

    pub fn build_delete_dashboard(&self, dashboard_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.url(&format!("/dashboards/{}", Self::segment(dashboard_id))),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Fire-and-forget push of an arbitrary JSON object to a dashboard.
    pub fn build_transmit(
        &self,
        dashboard_id: &str,
        transmission: &Transmission,
    ) -> Result<HttpRequest, DashkuError> {
        if !transmission.is_object() {
            return Err(DashkuError::Encoding(
                "transmission payload must be a JSON object".to_string(),
            ));
        }
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(&format!(
                "/dashboards/{}/transmissions",
                Self::segment(dashboard_id)
            )),
            headers: json_headers(),
            body: Some(transmission.to_string()),
        })
    }

    // --- widgets (nested under a dashboard) ---

    pub fn build_create_widget(
        &self,
        dashboard_id: &str,
        widget: &Widget,
    ) -> Result<HttpRequest, DashkuError> {
        let body =
            serde_json::to_string(widget).map_err(|e| DashkuError::Encoding(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(&format!(
                "/dashboards/{}/widgets",
                Self::segment(dashboard_id)
            )),
            headers: json_headers(),
            body: Some(body),
        })
    }

    pub fn build_update_widget(
        &self,
        dashboard_id: &str,
        widget: &Widget,
    ) -> Result<HttpRequest, DashkuError> {
        let id = require_id(widget, "widget")?;
        let body = diff::dirty_update_json(widget)?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.url(&format!(
                "/dashboards/{}/widgets/{}",
                Self::segment(dashboard_id),
                Self::segment(id)
            )),
            headers: json_headers(),
            body: Some(body),
        })
    }

    pub fn build_delete_widget(&self, dashboard_id: &str, widget_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.url(&format!(
                "/dashboards/{}/widgets/{}",
                Self::segment(dashboard_id),
                Self::segment(widget_id)
            )),
            headers: Vec::new(),
            body: None,
        }
    }

    // --- parsers ---

    pub fn parse_dashboards(&self, response: HttpResponse) -> Result<Vec<Dashboard>, DashkuError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn parse_dashboard(&self, response: HttpResponse) -> Result<Dashboard, DashkuError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn parse_created_dashboard(
        &self,
        response: HttpResponse,
    ) -> Result<Dashboard, DashkuError> {
        check_status(&response, 201)?;
        decode(&response)
    }

    pub fn parse_updated_dashboard(
        &self,
        response: HttpResponse,
    ) -> Result<Dashboard, DashkuError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn parse_created_widget(&self, response: HttpResponse) -> Result<Widget, DashkuError> {
        check_status(&response, 201)?;
        decode(&response)
    }

    pub fn parse_updated_widget(&self, response: HttpResponse) -> Result<Widget, DashkuError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn parse_deleted(&self, response: HttpResponse) -> Result<(), DashkuError> {
        check_status(&response, 204)
    }

    pub fn parse_transmitted(&self, response: HttpResponse) -> Result<(), DashkuError> {
        check_status(&response, 204)
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn form_headers() -> Vec<(String, String)> {
    vec![(
        "content-type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    )]
}

fn require_id<'a, T: DomainObject>(object: &'a T, kind: &str) -> Result<&'a str, DashkuError> {
    object.id().ok_or_else(|| {
        DashkuError::Configuration(format!("{kind} has never been created (no id)"))
    })
}

/// Map non-success status codes to the appropriate `DashkuError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), DashkuError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(DashkuError::NotFound);
    }
    Err(DashkuError::Server {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, DashkuError> {
    serde_json::from_str(&response.body)
        .map_err(|e| DashkuError::Transport(format!("malformed response body: {e}")))
}
