//! Declarative request descriptions.
//!
//! A [`Request`] says *what* to call: method, resource, headers, parameters
//! and the policies that steer the pipeline around it. Turning it into a
//! wire-level [`WireRequest`] is the job of a [`RequestEncoder`].
//!
//! # Fingerprints
//!
//! Mocks, ETags and offline entries are all keyed by a deterministic string
//! derived from method, resource and parameters:
//!
//! - [`Request::key`] is used for the mock registry and the offline store
//! - [`Request::etag_key`] prepends the base-URL prefix and is used for the
//!   ETag store
//!
//! Parameters are held in a sorted map so the same logical request always
//! produces the same key.

mod encoder;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub(crate) use encoder::base_prefix;
pub use encoder::{DefaultEncoder, RequestEncoder, WireRequest};

/// HTTP methods supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }

    /// Methods whose responses legitimately carry no body.
    pub fn allows_empty_body(&self) -> bool {
        matches!(self, Method::Head)
    }

    fn default_content_type(&self) -> ContentType {
        match self {
            Method::Get | Method::Head | Method::Delete => ContentType::Query,
            Method::Post | Method::Put | Method::Patch => ContentType::Json,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// How parameters are put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Parameters go into the URL query string; no body.
    Query,
    /// Parameters are sent as a JSON object body.
    Json,
    /// Parameters are sent as an `application/x-www-form-urlencoded` body.
    FormUrlEncoded,
    /// Only the given `Content-Type` header is set; parameters are not encoded.
    Custom(String),
}

impl ContentType {
    pub fn header(&self) -> Option<&str> {
        match self {
            ContentType::Query => None,
            ContentType::Json => Some("application/json"),
            ContentType::FormUrlEncoded => Some("application/x-www-form-urlencoded"),
            ContentType::Custom(value) => Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    #[default]
    UseProtocolCachePolicy,
    ReloadIgnoringLocalCacheData,
    ReturnCacheDataElseLoad,
}

/// Whether a request is persisted for replay when it fails while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorePolicy {
    #[default]
    Unspecified,
    Offline,
}

/// Whether stored ETags are sent back as `If-None-Match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtagPolicy {
    Enabled,
    Disabled,
}

/// A declarative description of one HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    resource: String,
    #[serde(default, deserialize_with = "lowercase_keys")]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    parameters: BTreeMap<String, serde_json::Value>,
    content_type: ContentType,
    #[serde(default)]
    cache_policy: CachePolicy,
    #[serde(default)]
    store_policy: StorePolicy,
    etag_policy: EtagPolicy,
}

impl Request {
    /// Creates a request with the method's defaults.
    ///
    /// GET requests have ETags enabled and encode parameters into the query
    /// string; POST, PUT and PATCH send a JSON body.
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            headers: BTreeMap::new(),
            parameters: BTreeMap::new(),
            content_type: method.default_content_type(),
            cache_policy: CachePolicy::default(),
            store_policy: StorePolicy::default(),
            etag_policy: if method == Method::Get {
                EtagPolicy::Enabled
            } else {
                EtagPolicy::Disabled
            },
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::Get, resource)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(Method::Post, resource)
    }

    pub fn put(resource: impl Into<String>) -> Self {
        Self::new(Method::Put, resource)
    }

    pub fn patch(resource: impl Into<String>) -> Self {
        Self::new(Method::Patch, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::Delete, resource)
    }

    pub fn head(resource: impl Into<String>) -> Self {
        Self::new(Method::Head, resource)
    }

    /// Sets a header. Names are case-insensitive and stored lowercased, so a
    /// later call with the same name in different case replaces the value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn store_policy(mut self, policy: StorePolicy) -> Self {
        self.store_policy = policy;
        self
    }

    pub fn etag_policy(mut self, policy: EtagPolicy) -> Self {
        self.etag_policy = policy;
        self
    }

    /// Replaces the resource, keeping everything else.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn parameters(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.parameters
    }

    pub fn get_content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn get_cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn get_store_policy(&self) -> StorePolicy {
        self.store_policy
    }

    pub fn get_etag_policy(&self) -> EtagPolicy {
        self.etag_policy
    }

    /// Fingerprint used by the mock registry and the offline store.
    pub fn key(&self) -> String {
        self.etag_key("")
    }

    /// Fingerprint used by the ETag store, with the base-URL prefix applied.
    pub fn etag_key(&self, prefix: &str) -> String {
        format!(
            "{} {}{} {}",
            self.method,
            prefix,
            self.resource,
            self.parameters_description()
        )
    }

    fn parameters_description(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> =
            self.parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        serde_json::Value::Object(map).to_string()
    }
}

fn lowercase_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let headers = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect())
}
