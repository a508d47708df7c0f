//! Request orchestration over HTTP.
//!
//! A [`Networking`] instance takes declarative [`Request`]s, schedules them on
//! an [`OperationQueue`] and hands back a [`Ride`] per request. Around each call
//! it can substitute registered [`Mock`]s, send and capture ETags, and persist
//! requests that failed while offline so that [`Networking::replay`] can retry
//! them later.
//!
//! ```rust,ignore
//! use riptide::{NetworkingBuilder, Request, StorePolicy, init_db};
//!
//! let networking = NetworkingBuilder::new()
//!     .base_url("https://api.example.com")?
//!     .build(init_db("data/riptide.db")?)?;
//!
//! let wave = networking
//!     .execute(Request::post("/events").parameter("kind", "login").store_policy(StorePolicy::Offline))
//!     .await?;
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod http;
pub mod log;
pub mod mock;
pub mod networking;
pub mod operation;
pub mod queue;
pub mod request;
pub mod stores;
pub mod validation;

pub use crate::db::{SqlitePool, StoreError, init_db};
pub use crate::http::{NetworkError, RawResponse, ReqwestTransport, ResponseMeta, Transport, Wave};
pub use crate::log::{LogLevel, NetworkLogger};
pub use crate::mock::{Mock, MockRegistry};
pub use crate::networking::{Middleware, Networking, NetworkingBuilder, PassThrough, RunMode};
pub use crate::operation::{Completion, Operation, Ride};
pub use crate::queue::{ConcurrencyMode, ModeGuard, OperationQueue, Slot};
pub use crate::request::{
    CachePolicy,
    ContentType,
    DefaultEncoder,
    EtagPolicy,
    Method,
    Request,
    RequestEncoder,
    StorePolicy,
    WireRequest,
};
pub use crate::stores::{EtagStore, OfflineRequestStore};
pub use crate::validation::{CompositeValidator, ContentTypeValidator, StatusCodeValidator, Validator};
