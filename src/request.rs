//! Deferred-error fluent request builder.
//!
//! A [`RequestBuilder`] represents one in-flight call under construction:
//! verb, hierarchical path segments, query parameters, headers, body, and
//! per-call timeout. Builder calls chain in a fluent style and never fail
//! fast: the first error is latched and every later call becomes a no-op,
//! so validation surfaces only at [`error`](RequestBuilder::error) or at
//! execution.
//!
//! # Path Hierarchy
//!
//! Segments render in fixed order, each settable at most once:
//!
//! ```text
//! prefix / resource-category / manager / resource / instance
//!        / sub-resource / sub-instance / stats / suffix...
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use mgmt_rest::client::RestClient;
//! use mgmt_rest::config::Config;
//!
//! # async fn run() -> mgmt_rest::error::Result<()> {
//! # let client = RestClient::new(Config::new("https://host"))?;
//! let response = client
//!     .get()
//!     .resource_category("tm")
//!     .manager_name("ltm")
//!     .resource("pool")
//!     .resource_instance(&["/Common/pool1"])
//!     .set_param("expandSubcollections", "true")
//!     .send()
//!     .await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Body, Method, Request, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::ContentConfig;
use crate::error::{
    classify, is_retryable_status, is_success_status, status_text, RestError, Result,
};
use crate::path::{escape_instance_path, join_path, validate_segment};
use crate::transport::RoundTripper;

/// Base backoff delay between retry attempts, doubled per attempt.
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Classified response envelope returned on success.
#[derive(Debug)]
pub struct RestResponse {
    /// HTTP status code (always in the success range).
    pub status: StatusCode,
    /// Response `Content-Type`, empty when the server sent none.
    pub content_type: String,
    /// Raw response bytes; unmarshalling is the caller's responsibility.
    pub body: Bytes,
}

/// Request body forms accepted by [`RequestBuilder::body`].
///
/// Exactly one form is retained per request: a file path (read eagerly at
/// the `body` call), raw bytes, or a streaming body. Mixing the bytes form
/// with the streaming form is detected at send time.
pub enum RequestBody {
    /// Path to a file whose contents become the body.
    File(PathBuf),
    /// Raw, already-serialized bytes.
    Bytes(Bytes),
    /// Streaming body; disables retries, since it can be sent only once.
    Stream(Body),
}

impl From<&str> for RequestBody {
    fn from(path: &str) -> Self {
        RequestBody::File(PathBuf::from(path))
    }
}

impl From<String> for RequestBody {
    fn from(path: String) -> Self {
        RequestBody::File(PathBuf::from(path))
    }
}

impl From<PathBuf> for RequestBody {
    fn from(path: PathBuf) -> Self {
        RequestBody::File(path)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes.into())
    }
}

impl From<&[u8]> for RequestBody {
    fn from(bytes: &[u8]) -> Self {
        RequestBody::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Body> for RequestBody {
    fn from(body: Body) -> Self {
        RequestBody::Stream(body)
    }
}

/// One REST call under construction. Single-use: consumed by
/// [`send`](RequestBuilder::send) or [`raw`](RequestBuilder::raw).
pub struct RequestBuilder {
    transport: Arc<dyn RoundTripper>,
    verb: Method,
    base_url: Url,
    path_prefix: String,
    content: ContentConfig,

    category: Option<String>,
    manager: Option<String>,
    resource: Option<String>,
    full_path: Option<String>,
    sub_resource: Option<String>,
    sub_path: Option<String>,
    stats: Option<String>,
    suffix: Vec<String>,

    params: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    body_bytes: Option<Bytes>,
    body_stream: Option<Body>,
    timeout: Option<Duration>,
    retries: u32,
    err: Option<RestError>,
}

impl RequestBuilder {
    pub(crate) fn new(
        transport: Arc<dyn RoundTripper>,
        verb: Method,
        base_url: Url,
        path_prefix: String,
        content: ContentConfig,
        retries: u32,
    ) -> Self {
        Self {
            transport,
            verb,
            base_url,
            path_prefix,
            content,
            category: None,
            manager: None,
            resource: None,
            full_path: None,
            sub_resource: None,
            sub_path: None,
            stats: None,
            suffix: Vec::new(),
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            body_bytes: None,
            body_stream: None,
            // The client-wide default timeout lives in the underlying HTTP
            // client; only an explicit per-call override is tracked here.
            timeout: None,
            retries,
            err: None,
        }
    }

    /// Override the HTTP verb.
    pub fn verb(mut self, verb: Method) -> Self {
        if self.err.is_none() {
            self.verb = verb;
        }
        self
    }

    /// Join additional segments onto the existing path prefix.
    pub fn prefix(mut self, segments: &[&str]) -> Self {
        if self.err.is_none() {
            let mut parts = vec![self.path_prefix.as_str()];
            parts.extend_from_slice(segments);
            self.path_prefix = join_path(&parts);
        }
        self
    }

    /// Append trailing segments after the whole hierarchy.
    pub fn suffix(mut self, segments: &[&str]) -> Self {
        if self.err.is_none() {
            self.suffix.extend(segments.iter().map(|s| s.to_string()));
        }
        self
    }

    /// Set the top-level resource category (e.g. `tm`). Settable once.
    pub fn resource_category(self, name: impl Into<String>) -> Self {
        self.set_validated_segment("resourceCategory", |b| &mut b.category, name.into())
    }

    /// Set the manager (module) name within the category (e.g. `ltm`).
    /// Settable once.
    pub fn manager_name(self, name: impl Into<String>) -> Self {
        self.set_validated_segment("managerName", |b| &mut b.manager, name.into())
    }

    /// Set the resource collection name (e.g. `pool`). Settable once.
    pub fn resource(self, name: impl Into<String>) -> Self {
        self.set_validated_segment("resource", |b| &mut b.resource, name.into())
    }

    /// Set the nested sub-resource collection under the instance.
    /// Each name is validated; settable once.
    pub fn sub_resource(mut self, names: &[&str]) -> Self {
        if self.err.is_some() {
            return self;
        }
        for name in names {
            let violations = validate_segment(name);
            if !violations.is_empty() {
                self.err = Some(invalid_segment("subResource", name, &violations));
                return self;
            }
        }
        self.set_segment("subResource", |b| &mut b.sub_resource, names.join("/"))
    }

    /// Set the resource instance identifier.
    ///
    /// The parts are joined with `/` and tilde-escaped, so a partitioned
    /// full path such as `/Common/pool1` survives as the single segment
    /// `~Common~pool1`. Settable once; not subject to plain-segment
    /// validation.
    pub fn resource_instance(self, full_path_parts: &[&str]) -> Self {
        if self.err.is_some() {
            return self;
        }
        let escaped = escape_instance_path(&full_path_parts.join("/"));
        self.set_segment("resourceInstance", |b| &mut b.full_path, escaped)
    }

    /// Set the sub-resource instance identifier, tilde-escaped like
    /// [`resource_instance`](Self::resource_instance). Settable once.
    pub fn sub_resource_instance(self, full_path_parts: &[&str]) -> Self {
        if self.err.is_some() {
            return self;
        }
        let escaped = escape_instance_path(&full_path_parts.join("/"));
        self.set_segment("subResourceInstance", |b| &mut b.sub_path, escaped)
    }

    /// Append the terminal statistics segment (e.g. `stats`) for read-only
    /// nested statistics endpoints. Settable once.
    pub fn sub_stats_resource(self, name: impl Into<String>) -> Self {
        self.set_validated_segment("subStatsResource", |b| &mut b.stats, name.into())
    }

    /// Add a query parameter value. Additive: repeated calls for the same
    /// key accumulate values.
    pub fn set_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if self.err.is_none() {
            self.params.entry(key.into()).or_default().push(value.into());
        }
        self
    }

    /// Set a header: any existing values for the key are removed, then the
    /// given values are added.
    pub fn set_header(mut self, key: &str, values: &[&str]) -> Self {
        if self.err.is_some() {
            return self;
        }
        let name = match HeaderName::try_from(key) {
            Ok(name) => name,
            Err(e) => {
                self.err = Some(RestError::Build(format!("invalid header name {key:?}: {e}")));
                return self;
            }
        };
        self.headers.remove(&name);
        for value in values {
            match HeaderValue::try_from(*value) {
                Ok(value) => {
                    self.headers.append(name.clone(), value);
                }
                Err(e) => {
                    self.err = Some(RestError::Build(format!(
                        "invalid value for header {key:?}: {e}"
                    )));
                    return self;
                }
            }
        }
        self
    }

    /// Override the timeout for this call.
    ///
    /// A non-zero timeout bounds the local call and is also rendered as a
    /// literal `timeout=<duration>` query parameter, informing the server
    /// of the desired server-side operation budget. Zero means no explicit
    /// timeout parameter and no local override.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if self.err.is_none() {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Opt in to retrying retryable failures up to `retries` extra
    /// attempts, with exponential backoff. Off by default; ignored for
    /// streaming bodies.
    pub fn retries(mut self, retries: u32) -> Self {
        if self.err.is_none() {
            self.retries = retries;
        }
        self
    }

    /// Attach a request body.
    ///
    /// Accepts a file path (read eagerly into bytes), raw bytes, or a
    /// streaming body; see [`RequestBody`]. The crate never serializes
    /// payloads; callers pass already-encoded bytes.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        if self.err.is_some() {
            return self;
        }
        match body.into() {
            RequestBody::File(path) => match std::fs::read(&path) {
                Ok(bytes) => self.body_bytes = Some(bytes.into()),
                Err(e) => {
                    self.err = Some(RestError::Build(format!(
                        "cannot read body file {}: {e}",
                        path.display()
                    )));
                }
            },
            RequestBody::Bytes(bytes) => self.body_bytes = Some(bytes),
            RequestBody::Stream(stream) => self.body_stream = Some(stream),
        }
        self
    }

    /// The first latched build error, if any.
    pub fn error(&self) -> Option<&RestError> {
        self.err.as_ref()
    }

    /// Render the final URL.
    ///
    /// Deterministic: the hierarchy joins onto the prefix only when a
    /// collection-level segment is set (category, manager, resource,
    /// sub-resource, or sub-instance); a bare call, or one carrying only
    /// an instance or stats segment, renders the raw prefix unchanged,
    /// preserving trailing-slash semantics for list-root requests. Query
    /// parameters render in sorted key order, with the timeout entry
    /// folded in.
    pub fn url(&self) -> String {
        let has_segments = self.category.is_some()
            || self.manager.is_some()
            || self.resource.is_some()
            || self.sub_resource.is_some()
            || self.sub_path.is_some();

        let mut path = if has_segments {
            join_path(&[
                &self.path_prefix,
                self.category.as_deref().unwrap_or(""),
                self.manager.as_deref().unwrap_or(""),
                self.resource.as_deref().unwrap_or(""),
                self.full_path.as_deref().unwrap_or(""),
                self.sub_resource.as_deref().unwrap_or(""),
                self.sub_path.as_deref().unwrap_or(""),
                self.stats.as_deref().unwrap_or(""),
            ])
        } else {
            self.path_prefix.clone()
        };

        if !self.suffix.is_empty() {
            let mut parts = vec![path.as_str()];
            parts.extend(self.suffix.iter().map(String::as_str));
            path = join_path(&parts);
        }

        let mut url = self.base_url.clone();
        url.set_path(&path);
        url.set_query(None);
        let query = self.render_query();
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        url.to_string()
    }

    /// Execute the call and classify the response.
    ///
    /// Success (status 200–226) yields the [`RestResponse`] envelope with
    /// the fully drained body. Failure yields the structured device error
    /// when the response carries the negotiated format, a plain status
    /// error otherwise.
    pub async fn send(mut self) -> Result<RestResponse> {
        let structured_format = self.content.accept.clone();
        let (status, content_type, body) = self.dispatch().await?;
        if let Some(err) = classify(status, &content_type, &body, &structured_format) {
            return Err(err);
        }
        Ok(RestResponse {
            status: StatusCode::from_u16(status)
                .map_err(|e| RestError::Build(format!("invalid status code {status}: {e}")))?,
            content_type,
            body,
        })
    }

    /// Execute the call and return the raw response bytes.
    ///
    /// No structured decoding is attempted: a non-success status produces
    /// the generic status error.
    pub async fn raw(mut self) -> Result<Bytes> {
        let (status, _, body) = self.dispatch().await?;
        if !is_success_status(status) {
            return Err(RestError::Status {
                status,
                text: status_text(status),
            });
        }
        Ok(body)
    }

    async fn dispatch(&mut self) -> Result<(u16, String, Bytes)> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        if self.body_bytes.is_some() && self.body_stream.is_some() {
            return Err(RestError::Build(
                "cannot set both body and bodyBytes".to_string(),
            ));
        }

        let rendered = self.url();
        let url = Url::parse(&rendered)
            .map_err(|e| RestError::Build(format!("invalid request URL {rendered:?}: {e}")))?;

        match self.timeout {
            // The timeout future owns its timer; dropping it on any exit
            // path releases the timer with it.
            Some(budget) if !budget.is_zero() => {
                tokio::time::timeout(budget, self.dispatch_attempts(url))
                    .await
                    .map_err(|_| RestError::Timeout(budget))?
            }
            _ => self.dispatch_attempts(url).await,
        }
    }

    async fn dispatch_attempts(&mut self, url: Url) -> Result<(u16, String, Bytes)> {
        // A streaming body can only be sent once.
        let max_retries = if self.body_stream.is_some() {
            0
        } else {
            self.retries
        };

        let mut attempt = 0u32;
        loop {
            let req = self.make_request(&url)?;
            debug!(verb = %self.verb, url = %url, attempt, "dispatching request");

            match self.transport.round_trip(req).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < max_retries && is_retryable_status(status) {
                        let delay = exponential_backoff(attempt, RETRY_BASE_DELAY_MS);
                        warn!(status, attempt, ?delay, "retryable status, backing off");
                        drop(response);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    let content_type = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    // Drain fully so the connection is returned cleanly.
                    let body = response.bytes().await.map_err(RestError::from)?;
                    return Ok((status, content_type, body));
                }
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = exponential_backoff(attempt, RETRY_BASE_DELAY_MS);
                    warn!(error = %e, attempt, ?delay, "retryable transport error, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn make_request(&mut self, url: &Url) -> Result<Request> {
        let mut req = Request::new(self.verb.clone(), url.clone());
        *req.headers_mut() = self.headers.clone();

        if !req.headers().contains_key(ACCEPT) {
            let accept = header_value("accept", &self.content.accept)?;
            req.headers_mut().insert(ACCEPT, accept);
        }

        let has_body = self.body_bytes.is_some() || self.body_stream.is_some();
        if has_body && !req.headers().contains_key(CONTENT_TYPE) {
            let content_type = header_value("content type", &self.content.content_type)?;
            req.headers_mut().insert(CONTENT_TYPE, content_type);
        }

        if let Some(bytes) = &self.body_bytes {
            *req.body_mut() = Some(Body::from(bytes.clone()));
        } else if let Some(stream) = self.body_stream.take() {
            *req.body_mut() = Some(stream);
        }
        Ok(req)
    }

    /// Set a validated plain segment, at most once.
    fn set_validated_segment(
        mut self,
        field: &'static str,
        slot: fn(&mut Self) -> &mut Option<String>,
        value: String,
    ) -> Self {
        if self.err.is_some() {
            return self;
        }
        let violations = validate_segment(&value);
        if !violations.is_empty() {
            self.err = Some(invalid_segment(field, &value, &violations));
            return self;
        }
        self.set_segment(field, slot, value)
    }

    /// Set a segment slot, latching a duplicate-set error when already
    /// populated.
    fn set_segment(
        mut self,
        field: &'static str,
        slot: fn(&mut Self) -> &mut Option<String>,
        value: String,
    ) -> Self {
        let mut duplicate = None;
        {
            let slot = slot(&mut self);
            match slot {
                Some(existing) => {
                    duplicate = Some(format!(
                        "{field} already set to \"{existing}\", cannot change to \"{value}\""
                    ));
                }
                None => *slot = Some(value),
            }
        }
        if let Some(message) = duplicate {
            self.err = Some(RestError::Build(message));
        }
        self
    }

    fn render_query(&self) -> String {
        let mut params = self.params.clone();
        if let Some(timeout) = self.timeout {
            if !timeout.is_zero() {
                params
                    .entry("timeout".to_string())
                    .or_default()
                    .push(fmt_duration(timeout));
            }
        }

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &params {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

fn invalid_segment(field: &str, value: &str, violations: &[String]) -> RestError {
    RestError::Build(format!(
        "invalid {field} \"{value}\": {}",
        violations.join(", ")
    ))
}

fn header_value(what: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::try_from(value)
        .map_err(|e| RestError::Build(format!("invalid {what} {value:?}: {e}")))
}

/// Duration rendered for the server-side `timeout` query parameter:
/// always seconds, with a fractional part only when the value has one
/// (`30s`, `1.5s`).
fn fmt_duration(d: Duration) -> String {
    format!("{}s", d.as_secs_f64())
}

/// Backoff delay between retry attempts, doubling per attempt.
fn exponential_backoff(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms * 2_u64.pow(attempt.min(10)))
}
