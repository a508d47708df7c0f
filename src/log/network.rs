use std::fmt;
use std::str::FromStr;

use log::{error, info};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, PROXY_AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::mask_secret;
use crate::http::{NetworkError, Wave};
use crate::request::WireRequest;

/// How much of each exchange [`NetworkLogger`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Failures only.
    Error,
    /// Request line, status and failures.
    #[default]
    Info,
    /// Adds headers and body sizes.
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Verbose => write!(f, "verbose"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "verbose" => Ok(LogLevel::Verbose),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkLogger {
    pub enabled: bool,
    pub level: LogLevel,
}

impl Default for NetworkLogger {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
        }
    }
}

impl NetworkLogger {
    pub fn new(enabled: bool, level: LogLevel) -> Self {
        Self { enabled, level }
    }

    pub fn disabled() -> Self {
        Self::new(false, LogLevel::Error)
    }

    fn logs(&self, level: LogLevel) -> bool {
        self.enabled && self.level >= level
    }

    pub fn log_request(&self, request: &WireRequest) {
        if !self.logs(LogLevel::Info) {
            return;
        }

        info!(method:% = request.method, url:% = request.url; "Sending request");

        if self.logs(LogLevel::Verbose) {
            info!(
                method:% = request.method,
                url:% = request.url,
                headers:% = describe_headers(&request.headers),
                body_bytes = request.body.as_ref().map_or(0, Vec::len);
                "Request details"
            );
        }
    }

    pub fn log_response(&self, wave: &Wave) {
        if !self.logs(LogLevel::Info) {
            return;
        }

        info!(
            method:% = wave.request.method,
            url:% = wave.request.url,
            status = wave.status().as_u16();
            "Received response"
        );

        if self.logs(LogLevel::Verbose) {
            info!(
                url:% = wave.request.url,
                headers:% = describe_headers(&wave.response.headers),
                body_bytes = wave.body.len();
                "Response details"
            );
        }
    }

    pub fn log_error(&self, key: &str, error: &NetworkError) {
        if !self.logs(LogLevel::Error) {
            return;
        }

        error!(request = key, offline = error.is_offline(), reason:% = error; "Request failed");
    }
}

/// Renders headers as `name: value` pairs with credentials masked.
fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            if name == AUTHORIZATION || name == COOKIE || name == PROXY_AUTHORIZATION {
                format!("{}: {}", name, mask_secret(value))
            } else {
                format!("{}: {}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
