//! Client configuration.
//!
//! [`Config`] carries the immutable-after-construction connection
//! parameters for a [`RestClient`](crate::client::RestClient): host,
//! default API path, content negotiation, credentials, timeout, TLS mode,
//! and the transport customization hooks. It is consumed once to build a
//! client and never mutated afterwards.
//!
//! Two pairs of fields are mutually exclusive, checked when the transport
//! chain is assembled:
//!
//! - `username`/`password` vs. `bearer_token`/`bearer_token_file`
//! - `transport` (a pre-built custom transport) vs. `insecure`
//!
//! # Examples
//!
//! ```
//! use mgmt_rest::config::Config;
//! use std::time::Duration;
//!
//! let config = Config {
//!     host: "device.example.com:8443".to_string(),
//!     api_path: Some("mgmt".to_string()),
//!     username: Some("admin".to_string()),
//!     password: Some("secret".to_string()),
//!     timeout: Some(Duration::from_secs(30)),
//!     ..Config::default()
//! };
//! # let _ = config;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::transport::RoundTripper;

/// Hook for wrapping the composed transport with further decorators
/// (logging, metrics, request capture). Applied outermost, after the auth
/// decorator.
pub type TransportWrapper =
    Arc<dyn Fn(Arc<dyn RoundTripper>) -> Arc<dyn RoundTripper> + Send + Sync>;

/// Content-type negotiation preferences.
///
/// The crate never marshals payloads itself; these values only populate the
/// `Content-Type` and `Accept` headers and select the structured format for
/// error-body decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    /// MIME type sent as `Content-Type` when a body is attached.
    pub content_type: String,
    /// MIME type sent as `Accept`, and the negotiated structured format for
    /// decoding error envelopes.
    pub accept: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_type: "application/json".to_string(),
            accept: "application/json".to_string(),
        }
    }
}

/// Connection parameters for a resource client.
#[derive(Clone, Default)]
pub struct Config {
    /// Bare `host:port` (scheme defaults to `https://`) or a full URL.
    pub host: String,
    /// Default API path prefix joined under the base URL (e.g. `mgmt`).
    pub api_path: Option<String>,
    /// Content negotiation preferences.
    pub content: ContentConfig,
    /// Basic auth username. Mutually exclusive with the bearer fields.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Static bearer token for the vendor auth header.
    pub bearer_token: Option<String>,
    /// Path to a plain-text token file, re-read lazily when stale.
    /// Mutually exclusive with `bearer_token`.
    pub bearer_token_file: Option<PathBuf>,
    /// Default per-request timeout; a request builder may override it.
    pub timeout: Option<Duration>,
    /// Skip TLS certificate verification. Explicit opt-in; mutually
    /// exclusive with `transport`.
    pub insecure: bool,
    /// Pre-built custom transport. When set, TLS options must be left at
    /// their defaults.
    pub transport: Option<Arc<dyn RoundTripper>>,
    /// Outermost transport decorator hook.
    pub wrap_transport: Option<TransportWrapper>,
    /// Opt-in retry budget for retryable failures; 0 disables retries.
    pub max_retries: u32,
}

impl Config {
    /// Create a config for the given host with all other fields defaulted.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Whether basic auth credentials are configured.
    pub(crate) fn has_basic_auth(&self) -> bool {
        self.username.is_some()
    }

    /// Whether any bearer token source is configured.
    pub(crate) fn has_bearer_auth(&self) -> bool {
        self.bearer_token.is_some() || self.bearer_token_file.is_some()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("api_path", &self.api_path)
            .field("content", &self.content)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("bearer_token_file", &self.bearer_token_file)
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .field("transport", &self.transport.as_ref().map(|_| "<custom>"))
            .field("wrap_transport", &self.wrap_transport.as_ref().map(|_| "<hook>"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_is_json() {
        let content = ContentConfig::default();
        assert_eq!(content.content_type, "application/json");
        assert_eq!(content.accept, "application/json");
    }

    #[test]
    fn test_auth_flags() {
        let mut config = Config::new("host");
        assert!(!config.has_basic_auth());
        assert!(!config.has_bearer_auth());

        config.username = Some("admin".into());
        assert!(config.has_basic_auth());

        let mut config = Config::new("host");
        config.bearer_token_file = Some("/tmp/token".into());
        assert!(config.has_bearer_auth());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut config = Config::new("host");
        config.password = Some("hunter2".into());
        config.bearer_token = Some("tok".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok\""));
        assert!(rendered.contains("<redacted>"));
    }
}
