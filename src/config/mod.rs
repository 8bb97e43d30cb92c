// Configuration management module
// TOML settings under ~/.bedrock-rag plus the interactive editor

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    BEARER_TOKEN_ENV, BedrockConfig, ChatConfig, Config, ConfigError, RagConfig, RetryConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
