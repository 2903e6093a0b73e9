//! Error types and response classification.
//!
//! The error hierarchy separates the four failure classes that callers need
//! to tell apart:
//!
//! | Variant | Class | When |
//! |---------|-------|------|
//! | [`RestError::Build`] | Build | Latched builder errors (invalid/duplicate segments, bad body combination) |
//! | [`RestError::Config`] | Build | Mutually exclusive configuration, malformed host |
//! | [`RestError::Transport`] | Transport | DNS, connect, TLS, and socket-level timeouts |
//! | [`RestError::Timeout`] | Transport | The per-call budget elapsed |
//! | [`RestError::Status`] | Protocol | Non-success status without a structured body |
//! | [`RestError::Device`] | Protocol | Decoded structured device error |
//! | [`RestError::ErrorBodyDecode`] | Decode | Structured error body failed to parse |
//! | [`RestError::Token`] | Build | First bearer-token file read failed |
//!
//! Build errors are detected before any network I/O and surfaced only when
//! the request executes; nothing in this crate panics across the API
//! boundary.
//!
//! # Examples
//!
//! ```
//! use mgmt_rest::error::{classify, is_success_status};
//!
//! assert!(is_success_status(226));
//! assert!(!is_success_status(227));
//!
//! let err = classify(404, "application/json",
//!     br#"{"code":404,"message":"not found"}"#, "application/json").unwrap();
//! assert_eq!(err.to_string(), "not found (code: 404)");
//! ```

use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, RestError>;

/// All errors produced by this crate.
#[derive(Debug, Error)]
pub enum RestError {
    /// A builder call was invalid; latched at call time, surfaced at execution.
    #[error("request build failed: {0}")]
    Build(String),

    /// The client or transport configuration was invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Transport-level failure, propagated unwrapped from the HTTP stack.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The per-call timeout budget elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status with no structured error body.
    #[error("{text}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical status reason text.
        text: String,
    },

    /// Structured error decoded from the device's error envelope.
    #[error(transparent)]
    Device(DeviceError),

    /// The structured error body could not be decoded.
    #[error("cannot read error message from response body: {0}")]
    ErrorBodyDecode(#[source] serde_json::Error),

    /// The initial bearer-token file read failed at construction time.
    #[error("cannot read bearer token: {0}")]
    Token(String),
}

impl RestError {
    /// Whether a retry may reasonably succeed.
    ///
    /// Connect failures, socket timeouts, the per-call budget, and the
    /// retryable status set all qualify; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::Transport(e) => e.is_timeout() || e.is_connect(),
            RestError::Timeout(_) => true,
            RestError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// The device's structured error envelope.
///
/// Decoded from `{"code": .., "message": .., "errorStack": [..]}` when a
/// non-success response carries the negotiated structured content type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceError {
    /// Device-assigned error code, usually mirroring the HTTP status.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Ordered stack of error context entries, innermost last.
    #[serde(default)]
    pub error_stack: Vec<String>,
}

impl DeviceError {
    /// Multi-line form: the display string plus each error-stack entry
    /// indented on its own line.
    pub fn verbose(&self) -> String {
        let mut out = self.to_string();
        for entry in &self.error_stack {
            out.push_str("\n    ");
            out.push_str(entry);
        }
        out
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for DeviceError {}

/// Whether a status code counts as success. The success range is 200
/// through 226 inclusive; everything else triggers error classification.
#[inline]
pub fn is_success_status(status: u16) -> bool {
    (200..=226).contains(&status)
}

/// Whether a status code indicates a retryable condition.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 502 | 503 | 504)
}

/// Canonical reason text for a status code.
pub(crate) fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unrecognized status code")
        .to_string()
}

/// Classify a received response as success or failure.
///
/// Returns `None` when the status is in the success range. Otherwise, if the
/// response `Content-Type` does not contain the negotiated structured format
/// the result is a plain [`RestError::Status`] carrying the status reason
/// text; if it does, the body is decoded as a [`DeviceError`], and a decode
/// failure becomes [`RestError::ErrorBodyDecode`].
pub fn classify(
    status: u16,
    content_type: &str,
    body: &[u8],
    structured_format: &str,
) -> Option<RestError> {
    if is_success_status(status) {
        return None;
    }
    if !content_type.contains(structured_format) {
        return Some(RestError::Status {
            status,
            text: status_text(status),
        });
    }
    match serde_json::from_slice::<DeviceError>(body) {
        Ok(device) => Some(RestError::Device(device)),
        Err(e) => Some(RestError::ErrorBodyDecode(e)),
    }
}
