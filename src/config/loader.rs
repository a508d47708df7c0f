use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::info;

use super::defaults::RiptideConfig;

pub fn get_default_config() -> &'static str {
    include_str!("../../config/config.toml")
}

/// Loads the TOML file at `path`, creating it from the embedded defaults if it
/// does not exist, with `RIPTIDE__SECTION__KEY` environment overrides on top.
pub fn load_configuration(path: &Path) -> Result<Config> {
    if !path.exists() {
        write_config_to(path, get_default_config()).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(
            Environment::with_prefix("RIPTIDE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Could not build config")
}

/// Loads the `[networking]` section, falling back to defaults for missing keys.
pub fn load_riptide_config(path: &Path) -> Result<RiptideConfig> {
    let cfg = load_configuration(path)?;
    match cfg.get::<RiptideConfig>(RiptideConfig::main_key_prefix()) {
        Ok(config) => Ok(config),
        Err(config::ConfigError::NotFound(_)) => Ok(RiptideConfig::default()),
        Err(e) => Err(e).context("Invalid networking configuration"),
    }
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}
