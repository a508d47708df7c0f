#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use riptide::http::BoxFuture;
use riptide::{NetworkError, Networking, NetworkingBuilder, RawResponse, ResponseMeta, Transport, WireRequest, init_db};
use tempfile::{TempDir, tempdir};

pub const BASE_URL: &str = "http://api.test";

/// One observed transport call.
#[derive(Debug, Clone)]
pub struct Call {
    pub request: WireRequest,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct State {
    delay: Mutex<Duration>,
    script: Mutex<VecDeque<Result<RawResponse, NetworkError>>>,
    calls: Mutex<Vec<Call>>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// An in-process transport that answers from a script and counts calls.
///
/// Once the script is exhausted every call answers `200 OK` with body `ok`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<State>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock().unwrap() = delay;
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    pub fn push(&self, result: Result<RawResponse, NetworkError>) {
        self.state.script.lock().unwrap().push_back(result);
    }

    pub fn push_ok(&self, response: ResponseMeta, body: &str) {
        self.push(Ok(RawResponse::new(response, body.as_bytes().to_vec())));
    }

    pub fn push_offline(&self) {
        self.push(Err(NetworkError::Offline("connection refused".into())));
    }

    pub fn started(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn reset_counters(&self) {
        self.state.calls.lock().unwrap().clear();
        self.state.started.store(0, Ordering::SeqCst);
        self.state.max_in_flight.store(0, Ordering::SeqCst);
    }

    async fn respond(&self, request: WireRequest) -> Result<RawResponse, NetworkError> {
        let started = Instant::now();
        self.state.started.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = *self.state.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::new(ResponseMeta::new(StatusCode::OK), b"ok".to_vec())));

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.calls.lock().unwrap().push(Call {
            request,
            started,
            finished: Instant::now(),
        });
        result
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: WireRequest) -> BoxFuture<'_, Result<RawResponse, NetworkError>> {
        Box::pin(self.respond(request))
    }
}

/// A `Networking` over a throwaway database. Keep the `TempDir` alive for the
/// duration of the test.
pub fn networking_with(
    transport: &ScriptedTransport,
    configure: impl FnOnce(NetworkingBuilder) -> NetworkingBuilder,
) -> (Networking, TempDir) {
    let temp_dir = tempdir().unwrap();
    let pool = init_db(temp_dir.path().join("riptide.db")).unwrap();
    let builder = NetworkingBuilder::new()
        .base_url(BASE_URL)
        .unwrap()
        .transport(transport.clone());
    let networking = configure(builder).build(pool).unwrap();
    (networking, temp_dir)
}

pub fn networking(transport: &ScriptedTransport) -> (Networking, TempDir) {
    networking_with(transport, |builder| builder)
}
