//! Injectable extension points of the dispatch pipeline.
//!
//! All hooks are optional. They run on the task that drives a request's
//! pipeline, never on the caller's thread, and must not block.

use std::sync::Arc;

use reqwest::header::HeaderMap;

use crate::http::{BoxFuture, NetworkError};
use crate::request::{Request, WireRequest};

/// An asynchronous precondition awaited before any request is built.
///
/// A typical implementation refreshes an access token. Returning an error
/// rejects the request with that error; nothing is built, enqueued or stored.
///
/// The gated request already holds its queue slot, so requests issued from
/// inside `prepare` through the same instance wait behind it under
/// [`ConcurrencyMode::Serial`](crate::ConcurrencyMode::Serial). Use a
/// separate instance for them.
pub trait Middleware: Send + Sync {
    fn prepare(&self) -> BoxFuture<'_, Result<(), NetworkError>>;
}

/// The default gate; lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Middleware for PassThrough {
    fn prepare(&self) -> BoxFuture<'_, Result<(), NetworkError>> {
        Box::pin(async { Ok(()) })
    }
}

impl<F> Middleware for F
where
    F: Fn() -> BoxFuture<'static, Result<(), NetworkError>> + Send + Sync,
{
    fn prepare(&self) -> BoxFuture<'_, Result<(), NetworkError>> {
        self()
    }
}

/// Rewrites a request before it is built. Fingerprints are still taken from
/// the request as submitted.
pub type BeforeEach = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Mutates the built wire request right before it is scheduled.
pub type PreProcess = Arc<dyn Fn(WireRequest) -> WireRequest + Send + Sync>;

/// Supplies extra headers for every request, applied after the defaults.
pub type AdditionalHeaders = Arc<dyn Fn() -> HeaderMap + Send + Sync>;
