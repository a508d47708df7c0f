use std::time::{Duration, Instant};

use log::trace;
use tokio::sync::RwLock;

use super::error::NetworkError;
use super::transport::{BoxFuture, Transport};
use super::types::{RawResponse, ResponseMeta};
use super::utils::{classify_middleware_error, classify_reqwest_error};
use crate::request::WireRequest;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// [`Transport`] backed by `reqwest`, with transient-failure retries.
pub struct ReqwestTransport {
    client: reqwest_middleware::ClientWithMiddleware,
    last_latency: RwLock<Option<(Duration, Instant)>>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::with_config(DEFAULT_MAX_RETRIES, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_config(max_retries: u32, timeout: Duration) -> Result<Self, anyhow::Error> {
        let retry_policy = reqwest_retry::policies::ExponentialBackoff::builder().build_with_max_retries(max_retries);

        let inner_client = reqwest::Client::builder().timeout(timeout).build()?;

        let client = reqwest_middleware::ClientBuilder::new(inner_client)
            .with(reqwest_retry::RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            last_latency: RwLock::new(None),
        })
    }

    async fn execute(&self, request: WireRequest) -> Result<RawResponse, NetworkError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(classify_middleware_error)?;
        let latency = start.elapsed();
        self.update_latency(latency).await;
        trace!(status = resp.status().as_u16(), latency_ms = latency.as_millis() as u64; "Transport response");

        let meta = ResponseMeta {
            status: resp.status(),
            headers: resp.headers().clone(),
        };
        let body = resp.bytes().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse::new(meta, body.to_vec()))
    }

    async fn update_latency(&self, duration: Duration) {
        *self.last_latency.write().await = Some((duration, Instant::now()));
    }

    pub async fn get_latency(&self) -> Option<Duration> {
        self.last_latency.read().await.map(|(d, _)| d)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: WireRequest) -> BoxFuture<'_, Result<RawResponse, NetworkError>> {
        Box::pin(self.execute(request))
    }
}
