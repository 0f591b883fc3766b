//! Error types for the dashboard API clients.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `Server` with the raw status
//! code and body for diagnostics. Timeouts are kept apart from transport
//! failures so callers can decide whether resubmitting makes sense — the
//! clients never retry on their own.

use thiserror::Error;

/// Errors surfaced by the dashboard clients.
#[derive(Debug, Error)]
pub enum DashkuError {
    /// Invalid construction parameters; raised before any network activity.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The request payload could not be serialized or encoded.
    #[error("failed to encode payload: {0}")]
    Encoding(String),

    /// The server returned 404 — the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// Connection-level failure or a malformed response body.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No response arrived before the request deadline.
    #[error("request timed out")]
    Timeout,

    /// The client was disposed; the request was not (or will never be) served.
    #[error("client disposed")]
    Disposed,
}

impl DashkuError {
    /// Whether this error is worth resubmitting for (the request may never
    /// have reached the server).
    pub fn is_timeout(&self) -> bool {
        matches!(self, DashkuError::Timeout)
    }
}
