//! Composable request transports.
//!
//! A [`RoundTripper`] sends one HTTP request and yields one response. The
//! base implementation wraps an owned `reqwest::Client`; decorators wrap
//! other round trippers to inject authentication without the caller or the
//! request builder knowing the chain's shape.
//!
//! # Chain Order
//!
//! ```text
//! wrap_transport hook (outermost)
//!   └── auth decorator (basic or bearer, at most one)
//!         └── base transport (reqwest client, closest to the wire)
//! ```
//!
//! [`transport_for`] assembles the whole chain from a [`Config`], enforcing
//! the two mutual-exclusion rules: basic vs. bearer credentials, and a
//! caller-supplied custom transport vs. TLS customization.
//!
//! # Examples
//!
//! ```no_run
//! use mgmt_rest::config::Config;
//! use mgmt_rest::transport::transport_for;
//!
//! let mut config = Config::new("device.example.com");
//! config.bearer_token = Some("tok".to_string());
//! let transport = transport_for(&config)?;
//! # let _ = transport;
//! # Ok::<(), mgmt_rest::error::RestError>(())
//! ```

mod auth;
mod token;

pub use auth::{BasicAuthTransport, BearerAuthTransport, DEVICE_AUTH_TOKEN_HEADER};
pub use token::{TokenSource, DEFAULT_REFRESH_PERIOD};

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{RestError, Result};

/// Send one HTTP request, get one response.
///
/// Implementations are composable in chains; every decorator owns its inner
/// transport behind an `Arc` so chains are cheap to share across request
/// builders.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    /// Dispatch a single request.
    async fn round_trip(&self, req: Request) -> Result<Response>;
}

impl std::fmt::Debug for dyn RoundTripper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RoundTripper")
    }
}

/// Base transport over an owned `reqwest::Client`.
///
/// Each resource client constructs its own instance; there is no
/// process-wide shared client.
pub struct ClientTransport {
    client: reqwest::Client,
}

impl ClientTransport {
    /// Wrap an already-built client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoundTripper for ClientTransport {
    async fn round_trip(&self, req: Request) -> Result<Response> {
        self.client.execute(req).await.map_err(RestError::from)
    }
}

/// Apply the configured auth decorator (and the wrap hook) around `base`.
///
/// Basic and bearer auth are mutually exclusive; with neither configured
/// the base transport passes through unchanged. The `wrap_transport` hook,
/// when present, wraps the whole result so callers can add decorators
/// without the auth layer knowing about them.
///
/// # Errors
///
/// Fails when both credential kinds are configured, when both bearer forms
/// are configured, or when the initial token-file read fails.
pub fn compose_auth(
    config: &Config,
    base: Arc<dyn RoundTripper>,
) -> Result<Arc<dyn RoundTripper>> {
    if config.has_basic_auth() && config.has_bearer_auth() {
        return Err(RestError::Config(
            "username/password or bearer token may be set, but not both".to_string(),
        ));
    }

    let mut transport = base;
    if config.has_basic_auth() {
        let username = config.username.as_deref().unwrap_or_default();
        let password = config.password.as_deref().unwrap_or_default();
        transport = Arc::new(BasicAuthTransport::new(transport, username, password)?);
    } else if let Some(token) = &config.bearer_token {
        if config.bearer_token_file.is_some() {
            return Err(RestError::Config(
                "bearer token and bearer token file may be set, but not both".to_string(),
            ));
        }
        let source = TokenSource::fixed(token.clone());
        transport = Arc::new(BearerAuthTransport::new(transport, source));
    } else if let Some(path) = &config.bearer_token_file {
        let source = TokenSource::from_file(path.clone())?;
        transport = Arc::new(BearerAuthTransport::new(transport, source));
    }

    if let Some(wrap) = &config.wrap_transport {
        transport = wrap(transport);
    }
    Ok(transport)
}

/// Build the full transport chain for a config.
///
/// A caller-supplied custom transport is used as-is under the auth
/// composition; constructing a TLS-aware transport on top of it is an
/// error, so caller-supplied transport settings are never silently
/// discarded. Otherwise a fresh `reqwest::Client` is built, with
/// certificate verification skipped only when `insecure` is set.
pub fn transport_for(config: &Config) -> Result<Arc<dyn RoundTripper>> {
    if let Some(custom) = &config.transport {
        if config.insecure {
            return Err(RestError::Config(
                "using a custom transport with TLS certificate options or the insecure flag is not allowed"
                    .to_string(),
            ));
        }
        return compose_auth(config, custom.clone());
    }

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if config.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }
    let client = builder.build().map_err(RestError::from)?;
    compose_auth(config, Arc::new(ClientTransport::new(client)))
}
