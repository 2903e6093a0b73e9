#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # mgmt-rest: Hierarchical REST Client
//!
//! This crate implements a generic, hierarchical REST request builder with
//! composable authentication transports, for device management APIs laid
//! out as a multi-segment resource hierarchy:
//!
//! ```text
//! prefix / resource-category / manager / resource-type / sub-resource / instance / stats
//! ```
//!
//! ## Overview
//!
//! The crate is organized around four cooperating pieces:
//!
//! 1. **Resource Client** - base URL + default API path, factory for
//!    per-verb request builders
//! 2. **Request Builder** - fluent, deferred-error accumulation of path
//!    segments, query parameters, headers, body, and timeout
//! 3. **Transport Chain** - composable [`RoundTripper`] decorators for
//!    Basic and bearer-token authentication over a reqwest base transport
//! 4. **Classification** - uniform success/error mapping of responses,
//!    including the device's structured error envelope
//!
//! The per-resource CRUD layer sits above this crate: it passes
//! already-serialized bytes in and unmarshals raw bytes out, so the core
//! stays protocol-format-agnostic beyond `Content-Type`/`Accept`
//! negotiation.
//!
//! ## Client Usage
//!
//! ```no_run
//! use mgmt_rest::{Config, RestClient};
//!
//! #[tokio::main]
//! async fn main() -> mgmt_rest::Result<()> {
//!     let mut config = Config::new("device.example.com:8443");
//!     config.api_path = Some("mgmt".to_string());
//!     config.username = Some("admin".to_string());
//!     config.password = Some("secret".to_string());
//!
//!     let client = RestClient::new(config)?;
//!
//!     // GET https://device.example.com:8443/mgmt/tm/ltm/pool/~Common~pool1
//!     let response = client
//!         .get()
//!         .resource_category("tm")
//!         .manager_name("ltm")
//!         .resource("pool")
//!         .resource_instance(&["/Common/pool1"])
//!         .send()
//!         .await?;
//!
//!     println!("{} bytes", response.body.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Bearer Tokens
//!
//! The device expects its token in a vendor header rather than the
//! standard `Authorization` scheme. The token may be fixed, or bound to a
//! file that is lazily re-read when stale:
//!
//! ```no_run
//! use mgmt_rest::Config;
//!
//! let mut config = Config::new("device.example.com");
//! config.bearer_token_file = Some("/var/run/secrets/device-token".into());
//! # let _ = config;
//! ```
//!
//! ## Module Structure
//!
//! - **[client]** - Resource client and host normalization
//! - **[request]** - Request builder, URL rendering, execution
//! - **[transport]** - RoundTripper chain, auth decorators, token sources
//! - **[config]** - Connection and content-negotiation configuration
//! - **[path]** - Segment validation and tilde escaping
//! - **[error]** - Error taxonomy and response classification

pub mod client;
pub mod config;
pub mod error;
pub mod path;
pub mod request;
pub mod transport;

pub use client::RestClient;
pub use config::{Config, ContentConfig, TransportWrapper};
pub use error::{DeviceError, RestError, Result};
pub use request::{RequestBody, RequestBuilder, RestResponse};
pub use transport::{RoundTripper, TokenSource, DEVICE_AUTH_TOKEN_HEADER};
