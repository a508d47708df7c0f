//! Helpers for mapping `reqwest` failures onto [`NetworkError`].
//!
//! Connect and timeout failures mean the remote end could not be reached at
//! all. Those are the only failures reported as
//! [`NetworkError::Offline`], which makes them eligible for offline
//! persistence and replay.

use super::error::NetworkError;

/// Classifies a `reqwest` error as connectivity-class or generic transport failure.
pub(crate) fn classify_reqwest_error(err: reqwest::Error) -> NetworkError {
    if err.is_connect() || err.is_timeout() {
        NetworkError::Offline(err.to_string())
    } else {
        NetworkError::Transport(err.to_string())
    }
}

/// Classifies an error coming out of the middleware stack.
///
/// The retry middleware hands back the last underlying `reqwest` error once
/// its attempts are exhausted, so that error is classified like a direct one.
pub(crate) fn classify_middleware_error(err: reqwest_middleware::Error) -> NetworkError {
    match err {
        reqwest_middleware::Error::Reqwest(err) => classify_reqwest_error(err),
        reqwest_middleware::Error::Middleware(err) => NetworkError::Transport(format!("{:#}", err)),
    }
}
