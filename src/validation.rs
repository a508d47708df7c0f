//! Post-response validation.
//!
//! Validators run after a [`Wave`] has been produced and report failures on the
//! same [`NetworkError`] channel as the rest of the pipeline. Use them through
//! [`Ride::validate`](crate::Ride::validate):
//!
//! ```rust,ignore
//! let wave = networking
//!     .execute(Request::get("/status"))
//!     .validate(&StatusCodeValidator::default())
//!     .await?;
//! ```

use std::ops::Range;

use crate::http::{NetworkError, Wave};

pub trait Validator: Send + Sync {
    fn validate(&self, wave: &Wave) -> Result<(), NetworkError>;
}

/// Accepts a range of status codes, `200..300` by default.
#[derive(Debug, Clone)]
pub struct StatusCodeValidator {
    acceptable: Range<u16>,
}

impl StatusCodeValidator {
    pub fn new(acceptable: Range<u16>) -> Self {
        Self { acceptable }
    }
}

impl Default for StatusCodeValidator {
    fn default() -> Self {
        Self::new(200..300)
    }
}

impl Validator for StatusCodeValidator {
    fn validate(&self, wave: &Wave) -> Result<(), NetworkError> {
        let status = wave.status().as_u16();
        if self.acceptable.contains(&status) {
            Ok(())
        } else {
            Err(NetworkError::UnacceptableStatusCode(status))
        }
    }
}

/// Accepts a fixed set of MIME types. `*/*` and `type/*` wildcards are honoured.
#[derive(Debug, Clone)]
pub struct ContentTypeValidator {
    acceptable: Vec<String>,
}

impl ContentTypeValidator {
    pub fn new<I, S>(acceptable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            acceptable: acceptable
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
        }
    }

    fn accepts(&self, mime: &str) -> bool {
        let (kind, _) = mime.split_once('/').unwrap_or((mime, ""));
        self.acceptable.iter().any(|candidate| {
            candidate == "*/*" || candidate == mime || candidate.strip_suffix("/*").is_some_and(|k| k == kind)
        })
    }
}

impl Validator for ContentTypeValidator {
    fn validate(&self, wave: &Wave) -> Result<(), NetworkError> {
        let mime = wave.response.mime_type().ok_or(NetworkError::MissingContentType)?;
        if self.accepts(&mime) {
            Ok(())
        } else {
            Err(NetworkError::UnacceptableContentType(mime))
        }
    }
}

/// Runs several validators in order, stopping at the first failure.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn Validator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl Validator for CompositeValidator {
    fn validate(&self, wave: &Wave) -> Result<(), NetworkError> {
        self.validators.iter().try_for_each(|validator| validator.validate(wave))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseMeta;
    use crate::request::{Method, WireRequest};
    use reqwest::StatusCode;
    use reqwest::header::{CONTENT_TYPE, HeaderValue};
    use url::Url;

    fn wave(status: u16, content_type: Option<&'static str>) -> Wave {
        let mut response = ResponseMeta::new(StatusCode::from_u16(status).unwrap());
        if let Some(content_type) = content_type {
            response = response.with_header(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Wave {
            body: Vec::new(),
            request: WireRequest::new(Method::Get, Url::parse("http://hyper.no").unwrap()),
            response,
        }
    }

    #[test]
    fn test_status_code_validation() {
        let validator = StatusCodeValidator::default();
        assert!(validator.validate(&wave(204, None)).is_ok());
        assert_eq!(
            validator.validate(&wave(404, None)),
            Err(NetworkError::UnacceptableStatusCode(404))
        );
        assert!(StatusCodeValidator::new(200..500).validate(&wave(404, None)).is_ok());
    }

    #[test]
    fn test_content_type_validation() {
        let validator = ContentTypeValidator::new(["application/json", "text/*"]);

        assert!(validator.validate(&wave(200, Some("application/json; charset=utf-8"))).is_ok());
        assert!(validator.validate(&wave(200, Some("text/plain"))).is_ok());
        assert_eq!(
            validator.validate(&wave(200, Some("image/png"))),
            Err(NetworkError::UnacceptableContentType("image/png".into()))
        );
        assert_eq!(validator.validate(&wave(200, None)), Err(NetworkError::MissingContentType));
    }

    #[test]
    fn test_composite_stops_at_first_failure() {
        let validator = CompositeValidator::new()
            .with(StatusCodeValidator::default())
            .with(ContentTypeValidator::new(["application/json"]));

        assert_eq!(
            validator.validate(&wave(500, None)),
            Err(NetworkError::UnacceptableStatusCode(500))
        );
        assert_eq!(validator.validate(&wave(200, None)), Err(NetworkError::MissingContentType));
        assert!(validator.validate(&wave(200, Some("application/json"))).is_ok());
    }
}
