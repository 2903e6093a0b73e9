//! Resource client.
//!
//! [`RestClient`] owns the normalized base URL, the default API path
//! prefix, the content negotiation preferences, and the composed transport
//! chain. It is immutable after construction and safe for concurrent use:
//! its only job is to spawn fresh, independent
//! [`RequestBuilder`](crate::request::RequestBuilder)s, one per call.
//!
//! # Examples
//!
//! ```no_run
//! use mgmt_rest::client::RestClient;
//! use mgmt_rest::config::Config;
//!
//! # async fn run() -> mgmt_rest::error::Result<()> {
//! let mut config = Config::new("device.example.com");
//! config.api_path = Some("mgmt".to_string());
//! config.username = Some("admin".to_string());
//! config.password = Some("secret".to_string());
//!
//! let client = RestClient::new(config)?;
//! let body = client
//!     .get()
//!     .resource_category("tm")
//!     .manager_name("ltm")
//!     .resource("pool")
//!     .resource_instance(&["/Common/pool1"])
//!     .raw()
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::Method;
use url::Url;

use crate::config::{Config, ContentConfig};
use crate::error::{RestError, Result};
use crate::path::join_path;
use crate::request::RequestBuilder;
use crate::transport::{transport_for, RoundTripper};

/// Client for one device management API endpoint.
#[derive(Clone)]
pub struct RestClient {
    base_url: Url,
    path_prefix: String,
    content: ContentConfig,
    transport: Arc<dyn RoundTripper>,
    max_retries: u32,
}

impl RestClient {
    /// Build a client from a config.
    ///
    /// The host is normalized (`host:port` defaults to `https://`, the path
    /// gains a trailing slash) and the transport chain is assembled once;
    /// both are shared by every builder the client spawns.
    ///
    /// # Errors
    ///
    /// Fails on a malformed host, on mutually exclusive credential or
    /// transport settings, or when the initial bearer-token file read
    /// fails.
    pub fn new(config: Config) -> Result<Self> {
        let transport = transport_for(&config)?;
        let base_url = default_base_url(&config.host)?;
        let path_prefix = match config.api_path.as_deref() {
            Some(api) if !api.is_empty() => join_path(&[base_url.path(), api]),
            _ => base_url.path().to_string(),
        };
        Ok(Self {
            base_url,
            path_prefix,
            content: config.content,
            transport,
            max_retries: config.max_retries,
        })
    }

    /// The normalized base URL (scheme + host, trailing-slash path).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The default API path prefix applied to every builder.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Start a GET request.
    pub fn get(&self) -> RequestBuilder {
        self.request(Method::GET)
    }

    /// Start a POST request.
    pub fn post(&self) -> RequestBuilder {
        self.request(Method::POST)
    }

    /// Start a PUT request.
    pub fn put(&self) -> RequestBuilder {
        self.request(Method::PUT)
    }

    /// Start a PATCH request.
    pub fn patch(&self) -> RequestBuilder {
        self.request(Method::PATCH)
    }

    /// Start a DELETE request.
    pub fn delete(&self) -> RequestBuilder {
        self.request(Method::DELETE)
    }

    fn request(&self, verb: Method) -> RequestBuilder {
        RequestBuilder::new(
            self.transport.clone(),
            verb,
            self.base_url.clone(),
            self.path_prefix.clone(),
            self.content.clone(),
            self.max_retries,
        )
    }
}

/// Normalize a host into a base URL.
///
/// A bare `host` or `host:port` pair defaults to `https://`; a full URL is
/// accepted as-is. A scheme-less value with a non-root path component is
/// rejected, since it is ambiguous where the host ends. The resulting path
/// always ends with `/`.
pub fn default_base_url(host: &str) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(RestError::Config("host must not be empty".to_string()));
    }

    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        if host.trim_end_matches('/').contains('/') {
            return Err(RestError::Config(format!(
                "host {host:?} must be a URL or a host(:port) pair"
            )));
        }
        format!("https://{host}")
    };

    let mut url = Url::parse(&candidate)
        .map_err(|e| RestError::Config(format!("invalid host {host:?}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_defaults_to_https() {
        let url = default_base_url("device.example.com").unwrap();
        assert_eq!(url.as_str(), "https://device.example.com/");
    }

    #[test]
    fn test_host_port_pair() {
        let url = default_base_url("device.example.com:8443").unwrap();
        assert_eq!(url.as_str(), "https://device.example.com:8443/");
    }

    #[test]
    fn test_full_url_accepted() {
        let url = default_base_url("http://device.example.com/mgmt").unwrap();
        assert_eq!(url.as_str(), "http://device.example.com/mgmt/");
    }

    #[test]
    fn test_trailing_slash_preserved() {
        let url = default_base_url("https://host/mgmt/").unwrap();
        assert_eq!(url.path(), "/mgmt/");
    }

    #[test]
    fn test_schemeless_path_rejected() {
        let err = default_base_url("host/mgmt/tm").unwrap_err();
        assert!(matches!(err, RestError::Config(_)));
        assert!(err.to_string().contains("host(:port) pair"));
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(default_base_url("  ").is_err());
    }

    #[test]
    fn test_prefix_joins_api_path() {
        let mut config = Config::new("https://host");
        config.api_path = Some("mgmt".into());
        let client = RestClient::new(config).unwrap();
        assert_eq!(client.path_prefix(), "/mgmt");
    }

    #[test]
    fn test_prefix_without_api_path_keeps_base_path() {
        let client = RestClient::new(Config::new("https://host/mgmt/")).unwrap();
        assert_eq!(client.path_prefix(), "/mgmt/");
    }

    #[test]
    fn test_verbs_seed_builders() {
        let client = RestClient::new(Config::new("https://host")).unwrap();
        assert_eq!(client.get().url(), "https://host/");
        assert!(client.post().error().is_none());
        assert!(client.delete().error().is_none());
    }
}
