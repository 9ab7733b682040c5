// Configuration management module
// TOML settings, the credentials file and the interactive setup

pub mod interactive;
pub mod secrets;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use secrets::Secrets;
pub use settings::{Config, ConfigError, NpcConfig, OpenAiConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
