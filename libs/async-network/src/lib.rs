#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Asynchronous HTTP client pipeline over a pluggable transport
//!
//! A caller describes a call with a [`Request`] and hands it to
//! [`Networking::send`], which:
//! - resolves it against the base URL into a wire-ready [`RawRequest`]
//! - passes the raw request through the optional [`Encryptor`] hook
//! - performs the exchange with the configured [`Transport`]
//! - passes successful responses through the optional [`Decryptor`] hook
//! - decodes the (optionally key-extracted) JSON body into the requested model
//! - emits a curl-style transcript when the request asks for it
//!
//! The default transport, [`HyperTransport`], runs on hyper + rustls with a
//! tower stack providing timeouts, decompression and redirect following.
//! It is built on the current tokio runtime, so building a [`Networking`]
//! without an explicit transport fails with
//! [`NetworkError::RuntimeUnavailable`] outside one.
//! [`CallbackTransport`] adapts completion-callback style transports.
//!
//! # Example
//!
//! ```ignore
//! use async_network::{Networking, Request};
//! use serde_json::json;
//!
//! let networking = Networking::builder()
//!     .base_url("https://api.example.com/v1")
//!     .build()?;
//!
//! let response = networking
//!     .send(
//!         &Request::post("/orders")
//!             .params(json!({"sku": "A-1", "qty": 2}))
//!             .data_key("data.order")
//!             .model::<Order>()
//!             .print_log(true),
//!     )
//!     .await?;
//!
//! if response.succeed() {
//!     let order = response.model::<Order>();
//! }
//! ```

mod builder;
mod callback;
mod client;
mod config;
mod error;
mod hooks;
pub mod log;
mod model;
mod networking;
mod request;
mod response;
mod tls;
mod transport;

pub use builder::HyperTransportBuilder;
pub use callback::{CallbackTransport, Completion};
pub use client::HyperTransport;
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, HyperTransportConfig,
    NetworkingConfig, TlsRootConfig, TransportSecurity,
};
pub use error::{BoxError, InvalidUrlKind, NetworkError};
pub use hooks::{Decryptor, Encryptor, Passthrough};
pub use log::{LogSink, TracingLogSink};
pub use model::{Model, ModelType};
pub use networking::{Networking, NetworkingBuilder};
pub use request::{RawRequest, Request};
pub use response::{Response, extract_data};
pub use transport::{Exchange, HttpMetadata, Transport, TransportResponse};
