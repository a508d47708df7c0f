use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::networking::RunMode;
use crate::queue::ConcurrencyMode;
use crate::request::Method;

#[derive(Parser)]
#[command(name = "riptide")]
#[command(about = "HTTP request orchestration with mocks, ETags and offline replay", long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Path to the configuration file",
        default_value = "data/config.toml"
    )]
    pub config: PathBuf,
    #[command(flatten)]
    pub database: DatabaseArgs,
    #[command(flatten)]
    pub network: NetworkArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    #[arg(long, global = true, help = "Path to the database file")]
    pub database_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    #[arg(short = 'u', long, global = true, help = "Base URL that relative resources are resolved against")]
    pub base_url: Option<String>,
    #[arg(long, global = true, help = "Run mode: regular, partial or fake")]
    pub run_mode: Option<RunMode>,
    #[arg(long, global = true, help = "Concurrency: serial, unlimited or capped:N")]
    pub concurrency: Option<ConcurrencyMode>,
}

/// Applies command line overrides on top of a loaded configuration.
pub trait ApplyArgs {
    fn apply_database(&mut self, args: &DatabaseArgs);
    fn apply_network(&mut self, args: &NetworkArgs);
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one request and print the response
    Send {
        #[arg(help = "HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD)")]
        method: Method,
        #[arg(help = "Resource path or absolute URL")]
        resource: String,
        #[arg(short, long = "param", help = "Request parameter in key=value format. Can be specified multiple times.")]
        params: Vec<String>,
        #[arg(short = 'H', long = "header", help = "Request header in key=value format. Can be specified multiple times.")]
        headers: Vec<String>,
        #[arg(long, help = "Store the request for replay if the network is unreachable")]
        offline: bool,
        #[arg(long, help = "Do not send a stored ETag as If-None-Match")]
        no_etag: bool,
    },
    /// Replay requests stored while offline
    Replay,
    /// List requests waiting for replay
    Pending,
    /// Remove every stored ETag
    ClearEtags,
}

/// Splits a `key=value` argument.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("Expected key=value, got '{}'", arg)),
    }
}
