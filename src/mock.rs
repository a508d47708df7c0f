//! Canned responses for deterministic testing.
//!
//! A [`Mock`] pairs a [`Request`] with what executing it should produce. The
//! [`MockRegistry`] keys mocks by [`Request::key`]; registering a second mock
//! for the same fingerprint replaces the first.
//!
//! Whether mocks are consulted at all is decided by the
//! [`RunMode`](crate::RunMode) of the [`Networking`](crate::Networking)
//! instance that owns the registry.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use crate::http::{NetworkError, ResponseMeta};
use crate::request::Request;

/// A canned outcome for one request fingerprint.
///
/// Evaluated in this order when executed: a stored `error` wins, then a
/// missing `response` yields [`NetworkError::NoResponseReceived`], then a
/// missing `body` yields [`NetworkError::NoDataInResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mock {
    pub request: Request,
    pub response: Option<ResponseMeta>,
    pub body: Option<Vec<u8>>,
    pub error: Option<NetworkError>,
}

impl Mock {
    pub fn new(request: Request, response: Option<ResponseMeta>, body: Option<Vec<u8>>) -> Self {
        Self {
            request,
            response,
            body,
            error: None,
        }
    }

    /// A mock answering with `status` and the given body.
    pub fn with_status(request: Request, status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(request, Some(ResponseMeta::new(status)), Some(body.into()))
    }

    /// A mock answering with `status` and `value` encoded as a JSON body.
    pub fn json(request: Request, status: StatusCode, value: &serde_json::Value) -> Self {
        let response =
            ResponseMeta::new(status).with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(request, Some(response), Some(value.to_string().into_bytes()))
    }

    /// A mock that always rejects with `error`.
    pub fn failing(request: Request, error: NetworkError) -> Self {
        Self {
            request,
            response: None,
            body: None,
            error: Some(error),
        }
    }

    pub fn key(&self) -> String {
        self.request.key()
    }
}

/// Registered mocks, one per request fingerprint.
#[derive(Debug, Default)]
pub struct MockRegistry {
    mocks: Mutex<HashMap<String, Mock>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `mock`, replacing any mock with the same fingerprint.
    pub fn register(&self, mock: Mock) {
        self.lock().insert(mock.key(), mock);
    }

    pub fn get(&self, request: &Request) -> Option<Mock> {
        self.lock().get(&request.key()).cloned()
    }

    pub fn remove(&self, request: &Request) -> Option<Mock> {
        self.lock().remove(&request.key())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Mock>> {
        self.mocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
