use std::future::Future;
use std::pin::Pin;

use super::error::NetworkError;
use super::types::RawResponse;
use crate::request::WireRequest;

/// A boxed, sendable future, used where traits must stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The low-level transport the pipeline hands wire requests to.
///
/// Implementations report connectivity failures as
/// [`NetworkError::Offline`] so that offline persistence can kick in; any
/// other failure should be [`NetworkError::Transport`]. A transport does not
/// judge status codes.
pub trait Transport: Send + Sync {
    fn send(&self, request: WireRequest) -> BoxFuture<'_, Result<RawResponse, NetworkError>>;
}
