//! HTTP plumbing underneath the request pipeline.
//!
//! This module holds everything that touches the wire or describes what came
//! back from it:
//!
//! - [`Transport`] - the seam the pipeline sends [`WireRequest`](crate::WireRequest)s through
//! - [`ReqwestTransport`] - the production transport, built on `reqwest` with
//!   retry middleware for transient failures and latency tracking
//! - [`NetworkError`] - the failure channel shared by the whole crate
//! - [`ResponseMeta`], [`RawResponse`] and [`Wave`] - response types
//!
//! # Error Handling
//!
//! Transports never judge status codes. A `404` is a successful transport
//! round-trip; whether it is acceptable is decided by a
//! [`Validator`](crate::validation::Validator) after the fact. Only failures
//! to reach the server at all are reported as [`NetworkError::Offline`].

mod error;
mod http_client;
mod transport;
mod types;
mod utils;

pub use error::NetworkError;
pub use http_client::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, ReqwestTransport};
pub use transport::{BoxFuture, Transport};
pub use types::{RawResponse, ResponseMeta, Wave};
