//! Authentication transport decorators.
//!
//! Each decorator wraps an inner [`RoundTripper`] and injects credentials
//! into requests that do not already carry the relevant auth header. A
//! request that arrives with the header set passes through untouched, so a
//! caller-supplied credential always wins over the configured one.
//!
//! The request is owned by the decorator for the duration of the round
//! trip, so credential injection mutates a value the caller can no longer
//! observe; no defensive copy is needed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use std::sync::Arc;

use crate::error::{RestError, Result};
use crate::transport::token::TokenSource;
use crate::transport::RoundTripper;

/// Vendor auth header carrying the bearer token. The device expects its
/// own header rather than the standard `Authorization` scheme.
pub const DEVICE_AUTH_TOKEN_HEADER: HeaderName =
    HeaderName::from_static("x-device-auth-token");

/// Decorator injecting `Authorization: Basic ...` from a fixed
/// username/password pair.
pub struct BasicAuthTransport {
    inner: Arc<dyn RoundTripper>,
    header_value: HeaderValue,
}

impl BasicAuthTransport {
    /// Wrap `inner`, injecting credentials for `username`/`password`.
    pub fn new(
        inner: Arc<dyn RoundTripper>,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let encoded = BASE64.encode(format!("{username}:{password}"));
        let mut header_value = HeaderValue::try_from(format!("Basic {encoded}"))
            .map_err(|e| RestError::Config(format!("invalid basic auth credentials: {e}")))?;
        header_value.set_sensitive(true);
        Ok(Self {
            inner,
            header_value,
        })
    }
}

#[async_trait]
impl RoundTripper for BasicAuthTransport {
    async fn round_trip(&self, mut req: Request) -> Result<Response> {
        if !req.headers().contains_key(AUTHORIZATION) {
            req.headers_mut()
                .insert(AUTHORIZATION, self.header_value.clone());
        }
        self.inner.round_trip(req).await
    }
}

/// Decorator injecting the vendor auth header from a [`TokenSource`].
pub struct BearerAuthTransport {
    inner: Arc<dyn RoundTripper>,
    source: TokenSource,
}

impl BearerAuthTransport {
    /// Wrap `inner`, injecting tokens from `source`.
    pub fn new(inner: Arc<dyn RoundTripper>, source: TokenSource) -> Self {
        Self { inner, source }
    }
}

#[async_trait]
impl RoundTripper for BearerAuthTransport {
    async fn round_trip(&self, mut req: Request) -> Result<Response> {
        if !req.headers().contains_key(DEVICE_AUTH_TOKEN_HEADER) {
            let token = self.source.token();
            let mut value = HeaderValue::try_from(token)
                .map_err(|e| RestError::Config(format!("invalid bearer token: {e}")))?;
            value.set_sensitive(true);
            req.headers_mut().insert(DEVICE_AUTH_TOKEN_HEADER, value);
        }
        self.inner.round_trip(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use url::Url;

    /// Terminal transport that records the headers of the dispatched
    /// request and answers 200.
    #[derive(Default)]
    struct Capture {
        seen: Mutex<Option<HeaderMap>>,
    }

    #[async_trait]
    impl RoundTripper for Capture {
        async fn round_trip(&self, req: Request) -> Result<Response> {
            *self.seen.lock() = Some(req.headers().clone());
            Ok(http::Response::builder()
                .status(200)
                .body("")
                .unwrap()
                .into())
        }
    }

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("https://host/mgmt/").unwrap())
    }

    #[tokio::test]
    async fn test_basic_injects_header() {
        let capture = Arc::new(Capture::default());
        let transport = BasicAuthTransport::new(capture.clone(), "user", "pass").unwrap();

        transport.round_trip(request()).await.unwrap();

        let seen = capture.seen.lock().take().unwrap();
        // base64("user:pass")
        assert_eq!(seen[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn test_basic_passes_through_existing() {
        let capture = Arc::new(Capture::default());
        let transport = BasicAuthTransport::new(capture.clone(), "user", "pass").unwrap();

        let mut req = request();
        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Basic Y2FsbGVy"));
        transport.round_trip(req).await.unwrap();

        let seen = capture.seen.lock().take().unwrap();
        assert_eq!(seen[AUTHORIZATION], "Basic Y2FsbGVy");
    }

    #[tokio::test]
    async fn test_bearer_injects_vendor_header() {
        let capture = Arc::new(Capture::default());
        let transport =
            BearerAuthTransport::new(capture.clone(), TokenSource::fixed("tok-1"));

        transport.round_trip(request()).await.unwrap();

        let seen = capture.seen.lock().take().unwrap();
        assert_eq!(seen[DEVICE_AUTH_TOKEN_HEADER], "tok-1");
        assert!(!seen.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_bearer_passes_through_existing() {
        let capture = Arc::new(Capture::default());
        let transport =
            BearerAuthTransport::new(capture.clone(), TokenSource::fixed("configured"));

        let mut req = request();
        req.headers_mut().insert(
            DEVICE_AUTH_TOKEN_HEADER,
            HeaderValue::from_static("caller-token"),
        );
        transport.round_trip(req).await.unwrap();

        let seen = capture.seen.lock().take().unwrap();
        assert_eq!(seen[DEVICE_AUTH_TOKEN_HEADER], "caller-token");
    }
}
