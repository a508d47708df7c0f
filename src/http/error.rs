//! Error types for request execution.
//!
//! This module defines the [`NetworkError`] enum which is the single failure
//! channel of the request pipeline. Every rejected [`Ride`](crate::Ride)
//! carries one of these variants, whether it came from building the request,
//! from the transport, from a mock, or from post-processing collaborators.

use thiserror::Error;

use crate::db::StoreError;

/// Errors that can occur while building, dispatching or post-processing a request.
///
/// The enum is `Clone` so that a [`Mock`](crate::Mock) can hold a canned
/// error and hand out an identical copy every time it is executed.
///
/// # Error Categories
///
/// - **Build errors**: [`InvalidUrl`](NetworkError::InvalidUrl),
///   [`Encoding`](NetworkError::Encoding). Fatal to the request, never
///   persisted for replay.
/// - **Connectivity errors**: [`Offline`](NetworkError::Offline). The only
///   class eligible for offline persistence.
/// - **Contract violations**: [`NoResponseReceived`](NetworkError::NoResponseReceived),
///   [`NoDataInResponse`](NetworkError::NoDataInResponse).
/// - **Dispatch errors**: [`NoMockProvided`](NetworkError::NoMockProvided),
///   [`Middleware`](NetworkError::Middleware), [`Cancelled`](NetworkError::Cancelled).
/// - **Post-processing errors**: validation and serialization variants.
///
/// # Example
///
/// ```rust,no_run
/// use riptide::NetworkError;
///
/// fn handle_error(err: NetworkError) {
///     match err {
///         NetworkError::Offline(reason) => eprintln!("Offline, will retry later: {}", reason),
///         NetworkError::UnacceptableStatusCode(status) => eprintln!("Server said {}", status),
///         _ => eprintln!("Request failed: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The request resource could not be resolved into a valid URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The request parameters or headers could not be encoded.
    #[error("Request encoding failed: {0}")]
    Encoding(String),

    /// The transport or mock completed without a response object.
    #[error("No response received")]
    NoResponseReceived,

    /// A response arrived without body data for a method that expects one.
    #[error("No data in response")]
    NoDataInResponse,

    /// The network is unreachable.
    ///
    /// This covers connection refused, DNS failures and timeouts. Requests
    /// with [`StorePolicy::Offline`](crate::StorePolicy::Offline) that fail
    /// with this error are persisted for replay.
    #[error("Network unreachable: {0}")]
    Offline(String),

    /// Any other transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The run mode requires a mock and none is registered for the request.
    #[error("No mock provided")]
    NoMockProvided,

    /// The operation was abandoned before it settled.
    #[error("Request cancelled")]
    Cancelled,

    /// The middleware gate refused to let the request through.
    #[error("Middleware rejected request: {0}")]
    Middleware(String),

    /// The response status code failed validation.
    #[error("Response status code {0} was unacceptable")]
    UnacceptableStatusCode(u16),

    /// The response content type failed validation.
    #[error("Response content type {0} was unacceptable")]
    UnacceptableContentType(String),

    /// The response carried no content type to validate.
    #[error("Response content type was missing")]
    MissingContentType,

    /// The response body was not the expected JSON document.
    #[error("JSON serialization failed: {0}")]
    JsonSerializationFailed(String),

    /// The response body was not valid UTF-8 text.
    #[error("String could not be serialized from response data")]
    StringSerializationFailed,

    /// Reading or writing one of the durable stores failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl NetworkError {
    /// Returns `true` for connectivity-class failures.
    pub fn is_offline(&self) -> bool {
        matches!(self, NetworkError::Offline(_))
    }

    /// Returns `true` when the operation was abandoned by a cancel-all.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NetworkError::Cancelled)
    }

    /// Returns `true` when the request could not be built.
    pub fn is_build_error(&self) -> bool {
        matches!(self, NetworkError::InvalidUrl(_) | NetworkError::Encoding(_))
    }
}

impl From<StoreError> for NetworkError {
    fn from(err: StoreError) -> Self {
        NetworkError::Storage(err.to_string())
    }
}
