//! Client construction parameters and timeout defaults.
//!
//! `api_key` and `host` are validated when the config is built and are
//! immutable afterward; the request timeout starts from [`default_timeout`]
//! and can be adjusted on the client itself later.

use std::time::Duration;

use crate::error::DashkuError;

/// Environment variable consulted for the default request timeout, in ms.
pub const TIMEOUT_ENV_VAR: &str = "DASHKU_TIMEOUT_MS";

/// Request and connect timeout used when the environment provides none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Connection parameters for one client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: String,
    host: String,
    port: u16,
    timeout: Duration,
}

impl ClientConfig {
    /// Validate and build a config. Empty `api_key` or `host` fail fast with
    /// a `Configuration` error before any network activity.
    pub fn new(
        api_key: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, DashkuError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DashkuError::Configuration(
                "api key must not be empty".to_string(),
            ));
        }
        let host = host.into();
        if host.trim().is_empty() {
            return Err(DashkuError::Configuration(
                "host must not be empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            host,
            port,
            timeout: default_timeout(),
        })
    }

    /// Override the initial request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Resolve the default timeout from the environment.
///
/// An unset or unparsable `DASHKU_TIMEOUT_MS` falls back to
/// [`DEFAULT_TIMEOUT`]; a bad value is a configuration default, not an error.
pub fn default_timeout() -> Duration {
    match std::env::var(TIMEOUT_ENV_VAR) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                tracing::debug!(value = %raw, "ignoring unparsable timeout override");
                DEFAULT_TIMEOUT
            }
        },
        Err(_) => DEFAULT_TIMEOUT,
    }
}
