use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;
use riptide::cli::{ApplyArgs, Cli, Commands, parse_key_value};
use riptide::config::load_riptide_config;
use riptide::{EtagPolicy, Networking, NetworkingBuilder, Request, StorePolicy, Wave, init_db};

#[tokio::main]
async fn main() -> Result<()> {
    riptide::log::init_logging()?;

    let cli = Cli::parse();

    let mut config = load_riptide_config(&cli.config)?;
    config.apply_database(&cli.database);
    config.apply_network(&cli.network);

    let pool = init_db(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let networking = NetworkingBuilder::from_config(&config)?.build(pool)?;

    info!(
        base_url:? = config.base_url,
        run_mode:% = config.run_mode,
        concurrency:% = config.concurrency;
        "Networking ready"
    );

    match cli.command {
        Commands::Send {
            method,
            resource,
            params,
            headers,
            offline,
            no_etag,
        } => {
            let mut request = Request::new(method, resource);
            for param in &params {
                let (key, value) = parse_key_value(param).map_err(|e| anyhow!(e))?;
                let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
                request = request.parameter(key, value);
            }
            for header in &headers {
                let (key, value) = parse_key_value(header).map_err(|e| anyhow!(e))?;
                request = request.header(key, value);
            }
            if offline {
                request = request.store_policy(StorePolicy::Offline);
            }
            if no_etag {
                request = request.etag_policy(EtagPolicy::Disabled);
            }

            let key = request.key();
            match networking.execute(request).await {
                Ok(wave) => print_wave(&wave),
                Err(e) if e.is_offline() && offline => {
                    println!("Network unreachable, stored for replay: {}", key);
                },
                Err(e) => return Err(e).context("Request failed"),
            }
        },
        Commands::Replay => replay(&networking).await?,
        Commands::Pending => {
            let pending = networking.offline_requests().all().await?;
            if pending.is_empty() {
                println!("No requests waiting for replay.");
            }
            for entry in pending {
                println!("{}  {}  {}", entry.id, entry.created_at, entry.key);
            }
        },
        Commands::ClearEtags => {
            let removed = networking.etags().clear().await?;
            println!("Removed {} stored ETag(s).", removed);
        },
    }

    Ok(())
}

async fn replay(networking: &Networking) -> Result<()> {
    let pending = networking.offline_requests().len().await?;
    match networking.replay().await {
        Ok(None) => println!("Nothing to replay."),
        Ok(Some(wave)) => {
            println!("Replayed {} request(s), last response:", pending);
            print_wave(&wave);
        },
        Err(e) => {
            let remaining = networking.offline_requests().len().await?;
            println!("Replayed {} request(s), {} still pending.", pending, remaining);
            return Err(e).context("Last replayed request failed");
        },
    }
    Ok(())
}

fn print_wave(wave: &Wave) {
    println!("{} {}", wave.request.method, wave.request.url);
    println!("Status: {}", wave.status());
    for (name, value) in wave.response.headers.iter() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    if !wave.body.is_empty() {
        println!();
        println!("{}", String::from_utf8_lossy(&wave.body));
    }
}
