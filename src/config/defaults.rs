use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cli::{ApplyArgs, DatabaseArgs, NetworkArgs};
use crate::http::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::log::LogLevel;
use crate::networking::RunMode;
use crate::queue::ConcurrencyMode;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiptideConfig {
    pub base_url: Option<String>,
    pub database_path: PathBuf,
    pub run_mode: RunMode,
    pub concurrency: ConcurrencyMode,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub logging: LoggingConfig,
}

impl RiptideConfig {
    pub fn main_key_prefix() -> &'static str {
        "networking"
    }
}

impl Default for RiptideConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            database_path: PathBuf::from("data/riptide.db"),
            run_mode: RunMode::Regular,
            concurrency: ConcurrencyMode::Unlimited,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            logging: LoggingConfig::default(),
        }
    }
}

impl ApplyArgs for RiptideConfig {
    fn apply_database(&mut self, args: &DatabaseArgs) {
        if let Some(database_path) = &args.database_path {
            self.database_path = database_path.clone();
        }
    }

    fn apply_network(&mut self, args: &NetworkArgs) {
        if let Some(base_url) = &args.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(run_mode) = args.run_mode {
            self.run_mode = run_mode;
        }
        if let Some(concurrency) = args.concurrency {
            self.concurrency = concurrency;
        }
    }
}
