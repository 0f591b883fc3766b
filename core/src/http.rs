//! HTTP transport types shared by both clients.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `DashkuApi` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; the blocking and asynchronous clients each
//! own the actual round-trip. This separation keeps request construction and
//! status interpretation deterministic and easy to test.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross thread
//! boundaries without lifetime concerns.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// An HTTP request described as plain data.
///
/// Built by `DashkuApi::build_*` methods and executed by one of the clients.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// Constructed by a client after executing an `HttpRequest`, then passed to
/// `DashkuApi::parse_*` methods for deserialization. Headers are captured for
/// diagnostics; the body is the sole data source.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Multi-line diagnostic rendering of the response envelope.
    pub fn render(&self) -> String {
        let mut out = String::from("HttpResponse [");
        out.push_str(&format!("\n\tStatus: {}", self.status));
        out.push_str(&format!("\n\tData Size: {}", self.body.len()));
        if !self.headers.is_empty() {
            out.push_str("\n\tHeaders:");
            for (name, value) in &self.headers {
                out.push_str(&format!("\n\t\t{name}: {value}"));
            }
        }
        out.push_str("\n]");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_status_and_headers() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: "[]".to_string(),
        };
        let rendered = response.render();
        assert!(rendered.contains("Status: 200"));
        assert!(rendered.contains("content-type: application/json"));
        assert!(rendered.contains("Data Size: 2"));
    }

    #[test]
    fn render_omits_empty_header_section() {
        let response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(!response.render().contains("Headers:"));
    }
}
