use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::Url;
use url::form_urlencoded;

use super::{CachePolicy, ContentType, Method, Request};
use crate::http::NetworkError;

/// A fully resolved request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl WireRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Turns a [`Request`] into a [`WireRequest`].
///
/// Implementations must be pure: the pipeline may call `build` once per
/// execution and treats any error as fatal for that request.
pub trait RequestEncoder: Send + Sync {
    fn build(&self, request: &Request, base_url: Option<&Url>, extra_headers: &HeaderMap)
    -> Result<WireRequest, NetworkError>;
}

/// Encoder handling query, JSON and form-urlencoded parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoder;

impl RequestEncoder for DefaultEncoder {
    fn build(
        &self,
        request: &Request,
        base_url: Option<&Url>,
        extra_headers: &HeaderMap,
    ) -> Result<WireRequest, NetworkError> {
        let mut url = resolve_url(base_url, request.resource())?;
        let mut headers = extra_headers.clone();

        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| NetworkError::Encoding(format!("header name {}: {}", name, e)))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| NetworkError::Encoding(format!("header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        if let Some(content_type) = request.get_content_type().header() {
            let value = HeaderValue::from_str(content_type)
                .map_err(|e| NetworkError::Encoding(format!("content type {}: {}", content_type, e)))?;
            headers.insert(CONTENT_TYPE, value);
        }

        match request.get_cache_policy() {
            CachePolicy::UseProtocolCachePolicy => {},
            CachePolicy::ReloadIgnoringLocalCacheData => {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            },
            CachePolicy::ReturnCacheDataElseLoad => {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-stale"));
            },
        }

        let parameters = request.parameters();
        let body = match request.get_content_type() {
            _ if parameters.is_empty() => None,
            ContentType::Query => {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in parameters {
                    pairs.append_pair(name, &parameter_text(value));
                }
                drop(pairs);
                None
            },
            ContentType::Json => {
                Some(serde_json::to_vec(parameters).map_err(|e| NetworkError::Encoding(e.to_string()))?)
            },
            ContentType::FormUrlEncoded => {
                let mut serializer = form_urlencoded::Serializer::new(String::new());
                for (name, value) in parameters {
                    serializer.append_pair(name, &parameter_text(value));
                }
                Some(serializer.finish().into_bytes())
            },
            ContentType::Custom(_) => None,
        };

        Ok(WireRequest {
            method: request.method(),
            url,
            headers,
            body,
        })
    }
}

/// The base URL as a string prefix, without a trailing slash.
pub(crate) fn base_prefix(base_url: Option<&Url>) -> String {
    base_url
        .map(|url| url.as_str().trim_end_matches('/').to_string())
        .unwrap_or_default()
}

fn resolve_url(base_url: Option<&Url>, resource: &str) -> Result<Url, NetworkError> {
    let raw = match base_url {
        Some(_) if Url::parse(resource).is_ok() => resource.to_string(),
        Some(base) => {
            let prefix = base_prefix(Some(base));
            if resource.is_empty() || resource.starts_with('/') {
                format!("{}{}", prefix, resource)
            } else {
                format!("{}/{}", prefix, resource)
            }
        },
        None => resource.to_string(),
    };

    Url::parse(&raw).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn parameter_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
