//! The dispatch engine.
//!
//! [`Networking`] turns a [`Request`] into a [`Ride`]. Each call runs the
//! following pipeline on a background task, any step of which may reject:
//!
//! 1. await the [`Middleware`] gate
//! 2. apply the `before_each` hook
//! 3. assemble default headers (language, credentials, hook output and the
//!    stored ETag as `If-None-Match`) and build the [`WireRequest`]
//! 4. apply the `pre_process` hook
//! 5. pick a mock or real [`Operation`] according to the [`RunMode`]
//! 6. schedule it on the [`OperationQueue`], in the place claimed when the
//!    request was submitted
//! 7. on success store the response ETag; on failure persist or forget the
//!    request in the offline store according to its [`StorePolicy`]
//!
//! A cancelled request leaves both stores untouched.
//!
//! Fingerprints used for mocks, ETags and offline entries are always taken
//! from the request as submitted, before `before_each` runs.

mod builder;
mod hooks;
mod replay;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH};
use serde::{Deserialize, Serialize};
use url::Url;

pub use builder::NetworkingBuilder;
pub use hooks::{AdditionalHeaders, BeforeEach, Middleware, PassThrough, PreProcess};

use crate::http::{NetworkError, Transport, Wave};
use crate::log::NetworkLogger;
use crate::mock::{Mock, MockRegistry};
use crate::operation::{Operation, Ride};
use crate::queue::{ConcurrencyMode, OperationQueue, Slot};
use crate::request::{EtagPolicy, Request, RequestEncoder, StorePolicy, base_prefix};
use crate::stores::{EtagStore, OfflineRequestStore};

/// Decides whether requests go to the transport or to registered mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Always use the transport.
    #[default]
    Regular,
    /// Use a mock when one is registered, the transport otherwise.
    Partial,
    /// Only use mocks; unmocked requests fail with [`NetworkError::NoMockProvided`].
    Fake,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Regular => write!(f, "regular"),
            RunMode::Partial => write!(f, "partial"),
            RunMode::Fake => write!(f, "fake"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(RunMode::Regular),
            "partial" => Ok(RunMode::Partial),
            "fake" => Ok(RunMode::Fake),
            _ => Err(format!("Invalid run mode: {}", s)),
        }
    }
}

/// A request orchestrator with its own queue, mocks and stores.
///
/// Cheap to clone; clones share all state. Several instances may live in one
/// process without affecting each other as long as they use separate
/// databases.
#[derive(Clone)]
pub struct Networking {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: Option<Url>,
    encoder: Arc<dyn RequestEncoder>,
    transport: Arc<dyn Transport>,
    queue: OperationQueue,
    mocks: MockRegistry,
    etags: EtagStore,
    offline: OfflineRequestStore,
    run_mode: RwLock<RunMode>,
    custom_headers: RwLock<HeaderMap>,
    accept_language: HeaderValue,
    middleware: Arc<dyn Middleware>,
    before_each: Option<BeforeEach>,
    pre_process: Option<PreProcess>,
    additional_headers: Option<AdditionalHeaders>,
    logger: NetworkLogger,
    replay_lock: tokio::sync::Mutex<()>,
}

impl Networking {
    pub fn builder() -> NetworkingBuilder {
        NetworkingBuilder::new()
    }

    /// Submits `request` and returns its outcome.
    ///
    /// The request's place in the queue is taken before this returns, so
    /// under [`ConcurrencyMode::Serial`] requests run in the order they were
    /// submitted. Must be called inside a Tokio runtime. The request runs
    /// even if the returned [`Ride`] is dropped.
    pub fn execute(&self, request: Request) -> Ride {
        let (completion, ride) = Ride::channel();
        let slot = self.inner.queue.reserve();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            completion.settle(inner.dispatch(request, slot).await);
        });
        ride
    }

    pub fn get(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::get(resource))
    }

    pub fn post(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::post(resource))
    }

    pub fn put(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::put(resource))
    }

    pub fn patch(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::patch(resource))
    }

    pub fn delete(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::delete(resource))
    }

    pub fn head(&self, resource: impl Into<String>) -> Ride {
        self.execute(Request::head(resource))
    }

    /// Registers `mock`, replacing any mock for the same fingerprint.
    pub fn register(&self, mock: Mock) {
        self.inner.mocks.register(mock);
    }

    pub fn mocks(&self) -> &MockRegistry {
        &self.inner.mocks
    }

    pub fn etags(&self) -> &EtagStore {
        &self.inner.etags
    }

    pub fn offline_requests(&self) -> &OfflineRequestStore {
        &self.inner.offline
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub fn run_mode(&self) -> RunMode {
        *self.inner.run_mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_run_mode(&self, mode: RunMode) {
        *self.inner.run_mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        debug!(mode:% = mode; "Run mode changed");
    }

    pub fn concurrency_mode(&self) -> ConcurrencyMode {
        self.inner.queue.mode()
    }

    pub fn set_concurrency_mode(&self, mode: ConcurrencyMode) {
        self.inner.queue.set_mode(mode);
    }

    /// Abandons every queued and in-flight request; their rides complete with
    /// [`NetworkError::Cancelled`].
    pub fn cancel_all_requests(&self) {
        self.inner.queue.cancel_all();
    }

    /// Sends HTTP basic credentials with every subsequent request.
    pub fn authenticate_basic(&self, username: &str, password: &str) -> Result<(), NetworkError> {
        let credentials = STANDARD.encode(format!("{}:{}", username, password));
        self.authenticate_header(&format!("Basic {}", credentials))
    }

    /// Sends a bearer token with every subsequent request.
    pub fn authenticate_bearer(&self, token: &str) -> Result<(), NetworkError> {
        self.authenticate_header(&format!("Bearer {}", token))
    }

    /// Sends `value` as the `Authorization` header with every subsequent request.
    pub fn authenticate_header(&self, value: &str) -> Result<(), NetworkError> {
        self.set_default_header(AUTHORIZATION, value)
    }

    /// Adds a header sent with every subsequent request. Request headers win.
    pub fn set_default_header(&self, name: HeaderName, value: &str) -> Result<(), NetworkError> {
        let value = HeaderValue::from_str(value).map_err(|e| NetworkError::Encoding(format!("header {}: {}", name, e)))?;
        self.inner
            .custom_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
        Ok(())
    }

    /// Stops sending credentials.
    pub fn clear_authentication(&self) {
        self.inner
            .custom_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);
    }
}

impl Inner {
    async fn dispatch(&self, request: Request, slot: Slot) -> Result<Wave, NetworkError> {
        let key = request.key();
        let operation = match self.prepare(&request).await {
            Ok(operation) => operation,
            Err(error) => {
                self.logger.log_error(&key, &error);
                return Err(error);
            },
        };

        let outcome = slot.fill(operation).await;
        self.finish(&request, &key, &outcome).await;
        outcome
    }

    /// Runs everything up to scheduling. A rejected request only releases its
    /// slot, and a Fake-mode request without a mock never reaches the stores.
    async fn prepare(&self, request: &Request) -> Result<Operation, NetworkError> {
        self.middleware.prepare().await?;

        let run_mode = *self.run_mode.read().unwrap_or_else(PoisonError::into_inner);
        let mock = match run_mode {
            RunMode::Regular => None,
            RunMode::Partial | RunMode::Fake => self.mocks.get(request),
        };

        let prepared = match &self.before_each {
            Some(hook) => hook(request.clone()),
            None => request.clone(),
        };

        let mut headers = self.default_headers();
        if run_mode != RunMode::Fake && prepared.get_etag_policy() == EtagPolicy::Enabled {
            self.apply_etag(request, &mut headers).await;
        }

        let wire = self.encoder.build(&prepared, self.base_url.as_ref(), &headers)?;
        let wire = match &self.pre_process {
            Some(hook) => hook(wire),
            None => wire,
        };

        let operation = match (run_mode, mock) {
            (RunMode::Regular, _) | (RunMode::Partial, None) => Operation::data(self.transport.clone(), wire),
            (RunMode::Partial | RunMode::Fake, Some(mock)) => Operation::mock(mock, wire),
            (RunMode::Fake, None) => return Err(NetworkError::NoMockProvided),
        };

        self.logger.log_request(operation.request());

        Ok(operation)
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, self.accept_language.clone());

        for (name, value) in self.custom_headers.read().unwrap_or_else(PoisonError::into_inner).iter() {
            headers.insert(name.clone(), value.clone());
        }

        if let Some(hook) = &self.additional_headers {
            for (name, value) in hook().iter() {
                headers.insert(name.clone(), value.clone());
            }
        }

        headers
    }

    async fn apply_etag(&self, request: &Request, headers: &mut HeaderMap) {
        let key = self.etag_key(request);
        match self.etags.get(&key).await {
            Ok(Some(token)) => match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                },
                Err(e) => warn!(key = key.as_str(), error:% = e; "Stored ETag is not a valid header value"),
            },
            Ok(None) => {},
            Err(e) => warn!(key = key.as_str(), error:% = e; "Could not read ETag store"),
        }
    }

    /// Side effects of a settled operation. Store failures are logged and do
    /// not change the outcome.
    async fn finish(&self, request: &Request, key: &str, outcome: &Result<Wave, NetworkError>) {
        let store_offline = request.get_store_policy() == StorePolicy::Offline;

        match outcome {
            Ok(wave) => {
                if let Some(token) = wave.response.etag() {
                    let etag_key = self.etag_key(request);
                    if let Err(e) = self.etags.add(&etag_key, token).await {
                        warn!(key = etag_key.as_str(), error:% = e; "Could not save ETag");
                    }
                }
                self.logger.log_response(wave);

                if store_offline {
                    self.forget_offline(key).await;
                }
            },
            Err(error) if error.is_cancelled() => {
                debug!(request = key; "Request cancelled, stores left untouched");
            },
            Err(error) => {
                self.logger.log_error(key, error);

                if store_offline {
                    if error.is_offline() {
                        match self.offline.save(request).await {
                            Ok(()) => debug!(request = key; "Stored request for replay"),
                            Err(e) => warn!(request = key, error:% = e; "Could not store request for replay"),
                        }
                    } else {
                        self.forget_offline(key).await;
                    }
                }
            },
        }
    }

    async fn forget_offline(&self, key: &str) {
        match self.offline.remove(key).await {
            Ok(true) => debug!(request = key; "Removed request from offline store"),
            Ok(false) => {},
            Err(e) => warn!(request = key, error:% = e; "Could not update offline store"),
        }
    }

    fn etag_key(&self, request: &Request) -> String {
        request.etag_key(&base_prefix(self.base_url.as_ref()))
    }
}

/// `Accept-Language` derived from `LANG`, e.g. `en_US.UTF-8` becomes `en-US`.
fn accept_language_from_env() -> HeaderValue {
    let lang = std::env::var("LANG").unwrap_or_default();
    accept_language(&lang)
}

fn accept_language(lang: &str) -> HeaderValue {
    let tag = lang.split(['.', '@']).next().unwrap_or_default().replace('_', "-");
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return HeaderValue::from_static("en");
    }
    HeaderValue::from_str(&tag).unwrap_or_else(|_| HeaderValue::from_static("en"))
}
