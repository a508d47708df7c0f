//! Units of work and their single-settlement outcomes.
//!
//! An [`Operation`] executes one wire request, either against a
//! [`Transport`] or against a [`Mock`], and produces exactly one
//! `Result<Wave, NetworkError>`. Operations have no side effects of their own;
//! ETag capture, logging and offline persistence are wired around them by
//! [`Networking`](crate::Networking).
//!
//! The outcome travels from a [`Completion`] to a [`Ride`] over a one-shot
//! channel. Settling consumes the `Completion`, so a second settlement cannot
//! be expressed. If the `Completion` is dropped unsettled (the operation was
//! abandoned) the `Ride` completes with [`NetworkError::Cancelled`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use log::trace;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::http::{NetworkError, Transport, Wave};
use crate::mock::Mock;
use crate::request::WireRequest;
use crate::validation::Validator;

type Outcome = Result<Wave, NetworkError>;

/// The outcome future of one request.
///
/// Await it to get the [`Wave`] or the error that ended the request. The
/// work behind a `Ride` keeps running if the `Ride` is dropped.
#[must_use = "a Ride does nothing unless awaited"]
#[derive(Debug)]
pub struct Ride {
    rx: oneshot::Receiver<Outcome>,
}

impl Ride {
    /// Creates a connected `Completion`/`Ride` pair.
    pub fn channel() -> (Completion, Ride) {
        let (tx, rx) = oneshot::channel();
        (Completion { tx }, Ride { rx })
    }

    /// A ride that is already rejected with `error`.
    pub fn rejected(error: NetworkError) -> Ride {
        let (completion, ride) = Self::channel();
        completion.reject(error);
        ride
    }

    /// Waits for the outcome and runs `validator` over a successful wave.
    pub async fn validate<V: Validator + ?Sized>(self, validator: &V) -> Outcome {
        let wave = self.await?;
        validator.validate(&wave)?;
        Ok(wave)
    }

    /// Waits for the outcome and decodes the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, NetworkError> {
        self.await?.json()
    }

    /// Waits for the outcome and decodes the body as UTF-8 text.
    pub async fn text(self) -> Result<String, NetworkError> {
        self.await?.text()
    }
}

impl Future for Ride {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(NetworkError::Cancelled)))
    }
}

/// The settling side of a [`Ride`].
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Outcome>,
}

impl Completion {
    pub fn resolve(self, wave: Wave) {
        self.settle(Ok(wave));
    }

    pub fn reject(self, error: NetworkError) {
        self.settle(Err(error));
    }

    pub fn settle(self, outcome: Outcome) {
        if self.tx.send(outcome).is_err() {
            trace!("Ride dropped before its outcome was delivered");
        }
    }
}

/// One request execution, against the real transport or a mock.
pub enum Operation {
    Data {
        transport: Arc<dyn Transport>,
        request: WireRequest,
    },
    Mock {
        mock: Mock,
        request: WireRequest,
    },
}

impl Operation {
    pub fn data(transport: Arc<dyn Transport>, request: WireRequest) -> Self {
        Operation::Data { transport, request }
    }

    pub fn mock(mock: Mock, request: WireRequest) -> Self {
        Operation::Mock { mock, request }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Operation::Mock { .. })
    }

    pub fn request(&self) -> &WireRequest {
        match self {
            Operation::Data { request, .. } | Operation::Mock { request, .. } => request,
        }
    }

    /// Runs the operation to its single outcome.
    pub async fn execute(self) -> Outcome {
        match self {
            Operation::Data { transport, request } => {
                let raw = transport.send(request.clone()).await?;
                let response = raw.response.ok_or(NetworkError::NoResponseReceived)?;
                let body = match raw.body {
                    Some(body) => body,
                    None if request.method.allows_empty_body() => Vec::new(),
                    None => return Err(NetworkError::NoDataInResponse),
                };

                Ok(Wave {
                    body,
                    request,
                    response,
                })
            },
            Operation::Mock { mock, request } => {
                if let Some(error) = mock.error {
                    return Err(error);
                }
                let response = mock.response.ok_or(NetworkError::NoResponseReceived)?;
                let body = mock.body.ok_or(NetworkError::NoDataInResponse)?;

                Ok(Wave {
                    body,
                    request,
                    response,
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{BoxFuture, RawResponse, ResponseMeta};
    use crate::request::{Method, Request};
    use reqwest::StatusCode;
    use url::Url;

    struct FixedTransport(Result<RawResponse, NetworkError>);

    impl Transport for FixedTransport {
        fn send(&self, _request: WireRequest) -> BoxFuture<'_, Result<RawResponse, NetworkError>> {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    fn wire(method: Method) -> WireRequest {
        WireRequest::new(method, Url::parse("http://hyper.no/status").unwrap())
    }

    fn data(result: Result<RawResponse, NetworkError>, method: Method) -> Operation {
        Operation::data(Arc::new(FixedTransport(result)), wire(method))
    }

    #[tokio::test]
    async fn test_mock_with_error_rejects_with_that_error() {
        let mock = Mock {
            request: Request::get("/status"),
            response: Some(ResponseMeta::new(StatusCode::OK)),
            body: Some(b"test".to_vec()),
            error: Some(NetworkError::JsonSerializationFailed("array".into())),
        };

        let result = Operation::mock(mock, wire(Method::Get)).execute().await;
        assert_eq!(result, Err(NetworkError::JsonSerializationFailed("array".into())));
    }

    #[tokio::test]
    async fn test_mock_without_response_rejects() {
        let mock = Mock::new(Request::get("/status"), None, Some(b"test".to_vec()));
        let result = Operation::mock(mock, wire(Method::Get)).execute().await;
        assert_eq!(result, Err(NetworkError::NoResponseReceived));
    }

    #[tokio::test]
    async fn test_mock_without_data_rejects() {
        let mock = Mock::new(Request::get("/status"), Some(ResponseMeta::new(StatusCode::OK)), None);
        let result = Operation::mock(mock, wire(Method::Get)).execute().await;
        assert_eq!(result, Err(NetworkError::NoDataInResponse));
    }

    #[tokio::test]
    async fn test_mock_resolves_with_canned_response() {
        let mock = Mock::with_status(Request::get("/status"), StatusCode::OK, "test");
        let request = wire(Method::Get);

        let wave = Operation::mock(mock.clone(), request.clone()).execute().await.unwrap();

        assert_eq!(Some(wave.body), mock.body);
        assert_eq!(wave.request, request);
        assert_eq!(Some(wave.response), mock.response);
    }

    #[tokio::test]
    async fn test_data_operation_transport_failure() {
        let result = data(Err(NetworkError::Offline("unreachable".into())), Method::Get)
            .execute()
            .await;
        assert_eq!(result, Err(NetworkError::Offline("unreachable".into())));
    }

    #[tokio::test]
    async fn test_data_operation_without_response() {
        let result = data(Ok(RawResponse::default()), Method::Get).execute().await;
        assert_eq!(result, Err(NetworkError::NoResponseReceived));
    }

    #[tokio::test]
    async fn test_data_operation_without_body() {
        let raw = RawResponse {
            response: Some(ResponseMeta::new(StatusCode::OK)),
            body: None,
        };

        let result = data(Ok(raw.clone()), Method::Get).execute().await;
        assert_eq!(result, Err(NetworkError::NoDataInResponse));

        // HEAD responses have no body by definition
        let wave = data(Ok(raw), Method::Head).execute().await.unwrap();
        assert!(wave.body.is_empty());
    }

    #[tokio::test]
    async fn test_ride_settles_once() {
        let (completion, ride) = Ride::channel();
        completion.reject(NetworkError::NoDataInResponse);
        assert_eq!(ride.await, Err(NetworkError::NoDataInResponse));
    }

    #[tokio::test]
    async fn test_abandoned_ride_is_cancelled() {
        let (completion, ride) = Ride::channel();
        drop(completion);
        assert_eq!(ride.await, Err(NetworkError::Cancelled));
    }

    #[tokio::test]
    async fn test_rejected_ride() {
        assert_eq!(Ride::rejected(NetworkError::NoMockProvided).await, Err(NetworkError::NoMockProvided));
    }
}
