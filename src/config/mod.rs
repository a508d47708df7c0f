mod defaults;
mod loader;

pub use defaults::{LoggingConfig, RiptideConfig};
pub use loader::{get_default_config, load_configuration, load_riptide_config, write_config_to};
