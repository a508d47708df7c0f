use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use super::hooks::{AdditionalHeaders, BeforeEach, Middleware, PassThrough, PreProcess};
use super::{Inner, Networking, RunMode, accept_language_from_env};
use crate::config::RiptideConfig;
use crate::db::SqlitePool;
use crate::http::{ReqwestTransport, Transport};
use crate::log::NetworkLogger;
use crate::mock::MockRegistry;
use crate::queue::{ConcurrencyMode, OperationQueue};
use crate::request::{DefaultEncoder, Request, RequestEncoder, WireRequest};
use crate::stores::{EtagStore, OfflineRequestStore};

/// Builder for a [`Networking`] instance.
///
/// Everything except the database pool has a default: no base URL, the
/// [`ReqwestTransport`] with default retries and timeout, the
/// [`DefaultEncoder`], [`RunMode::Regular`], [`ConcurrencyMode::Unlimited`],
/// no hooks and logging at info level.
///
/// # Example
///
/// ```rust,ignore
/// use riptide::{ConcurrencyMode, NetworkingBuilder, RunMode, init_db};
///
/// let pool = init_db("data/riptide.db")?;
/// let networking = NetworkingBuilder::new()
///     .base_url("https://api.example.com/v1")?
///     .run_mode(RunMode::Partial)
///     .concurrency(ConcurrencyMode::Capped(4))
///     .before_each(|request| request.header("X-Client", "riptide"))
///     .build(pool)?;
///
/// let wave = networking.get("/status").await?;
/// ```
pub struct NetworkingBuilder {
    base_url: Option<Url>,
    transport: Option<Arc<dyn Transport>>,
    encoder: Arc<dyn RequestEncoder>,
    run_mode: RunMode,
    concurrency: ConcurrencyMode,
    timeout: Duration,
    max_retries: u32,
    middleware: Arc<dyn Middleware>,
    before_each: Option<BeforeEach>,
    pre_process: Option<PreProcess>,
    additional_headers: Option<AdditionalHeaders>,
    logger: NetworkLogger,
    accept_language: Option<HeaderValue>,
}

impl Default for NetworkingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkingBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            transport: None,
            encoder: Arc::new(DefaultEncoder),
            run_mode: RunMode::Regular,
            concurrency: ConcurrencyMode::Unlimited,
            timeout: Duration::from_secs(crate::http::DEFAULT_TIMEOUT_SECS),
            max_retries: crate::http::DEFAULT_MAX_RETRIES,
            middleware: Arc::new(PassThrough),
            before_each: None,
            pre_process: None,
            additional_headers: None,
            logger: NetworkLogger::default(),
            accept_language: None,
        }
    }

    /// Starts from the values of a loaded configuration.
    pub fn from_config(config: &RiptideConfig) -> anyhow::Result<Self> {
        let mut builder = Self::new()
            .run_mode(config.run_mode)
            .concurrency(config.concurrency)
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_retries(config.max_retries)
            .logger(NetworkLogger::new(config.logging.enabled, config.logging.level));

        if let Some(base_url) = config.base_url.as_deref().filter(|url| !url.is_empty()) {
            builder = builder.base_url(base_url)?;
        }

        Ok(builder)
    }

    /// Sets the URL relative resources are resolved against.
    ///
    /// Its string form, without a trailing slash, also prefixes ETag keys.
    pub fn base_url(mut self, base_url: &str) -> anyhow::Result<Self> {
        let url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Replaces the default `reqwest` transport, e.g. with a test double.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn encoder(mut self, encoder: impl RequestEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    pub fn concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Timeout of the default transport. Ignored with a custom transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry budget of the default transport. Ignored with a custom transport.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Installs the gate awaited before every request.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware = Arc::new(middleware);
        self
    }

    pub fn before_each<F>(mut self, hook: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.before_each = Some(Arc::new(hook));
        self
    }

    pub fn pre_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(WireRequest) -> WireRequest + Send + Sync + 'static,
    {
        self.pre_process = Some(Arc::new(hook));
        self
    }

    pub fn additional_headers<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> HeaderMap + Send + Sync + 'static,
    {
        self.additional_headers = Some(Arc::new(hook));
        self
    }

    pub fn logger(mut self, logger: NetworkLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Overrides the `Accept-Language` value otherwise derived from `LANG`.
    pub fn accept_language(mut self, value: HeaderValue) -> Self {
        self.accept_language = Some(value);
        self
    }

    /// Creates the instance. Must be called inside a Tokio runtime, which
    /// hosts the operation queue.
    pub fn build(self, pool: SqlitePool) -> anyhow::Result<Networking> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::with_config(self.max_retries, self.timeout)
                    .context("Failed to create HTTP transport")?,
            ),
        };

        Ok(Networking {
            inner: Arc::new(Inner {
                base_url: self.base_url,
                encoder: self.encoder,
                transport,
                queue: OperationQueue::new(self.concurrency),
                mocks: MockRegistry::new(),
                etags: EtagStore::new(pool.clone()),
                offline: OfflineRequestStore::new(pool),
                run_mode: RwLock::new(self.run_mode),
                custom_headers: RwLock::new(HeaderMap::new()),
                accept_language: self.accept_language.unwrap_or_else(accept_language_from_env),
                middleware: self.middleware,
                before_each: self.before_each,
                pre_process: self.pre_process,
                additional_headers: self.additional_headers,
                logger: self.logger,
                replay_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }
}
