//! Logging setup and request/response log lines.
//!
//! The binary calls [`init_logging`] once at startup. Library code only uses
//! the `log` facade; [`NetworkLogger`] formats the per-request lines emitted by
//! [`Networking`](crate::Networking).

pub mod network;
pub mod structured_console_encoder;

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use log::{debug, info};
use log4rs::{
    Config,
    config::{Deserializers, RawConfig},
};

pub use network::{LogLevel, NetworkLogger};

use crate::log::structured_console_encoder::StructuredConsoleEncoderDeserializer;

const EXTERNAL_CONFIG: &str = "log4rs.yml";

/// Initializes logging from `log4rs.yml` in the working directory, falling
/// back to the embedded defaults.
pub fn init_logging() -> anyhow::Result<()> {
    let mut deserializers = Deserializers::default();
    deserializers.insert("structured_console", StructuredConsoleEncoderDeserializer);

    let path = Path::new(EXTERNAL_CONFIG);
    if path.exists() {
        log4rs::init_file(path, deserializers)
            .with_context(|| format!("Failed to load external {}", EXTERNAL_CONFIG))?;
        info!(path = EXTERNAL_CONFIG; "Logging initialized from external configuration");
        return Ok(());
    }

    let yaml_content = include_str!("../../resources/default_log4rs.yml");
    let raw_config: RawConfig =
        serde_yaml::from_str(yaml_content).context("Embedded logging configuration is invalid YAML")?;

    let (appenders, errors) = raw_config.appenders_lossy(&deserializers);
    if !errors.is_empty() {
        return Err(anyhow!("Errors parsing embedded appenders: {:?}", errors));
    }

    let config = Config::builder()
        .appenders(appenders)
        .loggers(raw_config.loggers())
        .build(raw_config.root())
        .context("Failed to build logging config")?;

    log4rs::init_config(config).context("Failed to initialize logging from embedded config")?;

    debug!("Logging initialized from embedded defaults (no external log4rs.yml found)");
    Ok(())
}

fn reveal_secrets() -> bool {
    static REVEAL_SECRETS_CACHE: OnceLock<bool> = OnceLock::new();

    *REVEAL_SECRETS_CACHE.get_or_init(|| {
        std::env::var("REVEAL_SECRETS")
            .map(|v| {
                let val = v.to_lowercase();
                val == "true" || val == "1"
            })
            .unwrap_or(false)
    })
}

/// Masks a credential-bearing header value, keeping the auth scheme visible.
/// If REVEAL_SECRETS is true, returns the original string.
pub fn mask_secret(value: &str) -> String {
    if reveal_secrets() {
        return value.to_string();
    }

    match value.split_once(' ') {
        Some((scheme, _)) if !scheme.is_empty() => format!("{} ***", scheme),
        _ => "***".to_string(),
    }
}
