use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, ETAG, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use super::error::NetworkError;
use crate::request::WireRequest;

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The `ETag` header, if present and valid UTF-8.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|value| value.to_str().ok())
    }

    /// The MIME type of the `Content-Type` header without parameters.
    pub fn mime_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let mime = value.split(';').next()?.trim();
        (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
    }
}

/// What a transport hands back before the pipeline checks it.
///
/// Either part may be missing; the operation turns a missing response into
/// [`NetworkError::NoResponseReceived`] and a missing body into
/// [`NetworkError::NoDataInResponse`].
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub response: Option<ResponseMeta>,
    pub body: Option<Vec<u8>>,
}

impl RawResponse {
    pub fn new(response: ResponseMeta, body: Vec<u8>) -> Self {
        Self {
            response: Some(response),
            body: Some(body),
        }
    }
}

/// The successful outcome of one executed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub body: Vec<u8>,
    pub request: WireRequest,
    pub response: ResponseMeta,
}

impl Wave {
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    /// Decodes the body as a JSON document.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, NetworkError> {
        serde_json::from_slice(&self.body).map_err(|e| NetworkError::JsonSerializationFailed(e.to_string()))
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self) -> Result<String, NetworkError> {
        String::from_utf8(self.body.clone()).map_err(|_| NetworkError::StringSerializationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, WireRequest};
    use serde::Deserialize;
    use url::Url;

    fn wave(body: &[u8]) -> Wave {
        Wave {
            body: body.to_vec(),
            request: WireRequest::new(Method::Get, Url::parse("http://localhost/status").unwrap()),
            response: ResponseMeta::new(StatusCode::OK)
                .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8")),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        status: String,
    }

    #[test]
    fn test_json_body() {
        let parsed: Status = wave(br#"{"status":"ok"}"#).json().unwrap();
        assert_eq!(parsed.status, "ok");
    }

    #[test]
    fn test_json_body_mismatch() {
        let result: Result<Status, _> = wave(b"[1,2,3]").json();
        assert!(matches!(result, Err(NetworkError::JsonSerializationFailed(_))));
    }

    #[test]
    fn test_text_body() {
        assert_eq!(wave(b"ok").text().unwrap(), "ok");
        assert_eq!(wave(&[0xff, 0xfe]).text(), Err(NetworkError::StringSerializationFailed));
    }

    #[test]
    fn test_mime_type_strips_parameters() {
        assert_eq!(wave(b"").response.mime_type().as_deref(), Some("application/json"));
        assert_eq!(ResponseMeta::new(StatusCode::OK).mime_type(), None);
    }
}
