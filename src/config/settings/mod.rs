
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable holding the Bedrock API key
pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub bedrock: BedrockConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BedrockConfig {
    pub region: String,
    /// Overrides the regional runtime endpoint, e.g. for a VPC endpoint or a local mock
    pub endpoint: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            chat_model: "ai21.jamba-1-5-mini-v1:0".to_string(),
            embedding_model: "amazon.titan-embed-text-v1".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub temperature: f32,
    pub languages: Vec<String>,
    pub max_input_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            languages: vec![
                "English".to_string(),
                "Spanish".to_string(),
                "Hindi".to_string(),
            ],
            max_input_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    pub temperature: f32,
    /// Directory scanned for PDFs when building the index
    pub data_dir: PathBuf,
    /// Directory holding the persisted vector index
    pub index_dir: PathBuf,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("faiss_index"),
            top_k: 3,
            chunk_size: 1000,
            chunk_overlap: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_seconds: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_seconds: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid region: {0:?} (cannot be empty or contain whitespace)")]
    InvalidRegion(String),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid model id: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid temperature: {0} (must be between 0.0 and 1.0)")]
    InvalidTemperature(f32),
    #[error("At least one response language must be configured")]
    NoLanguages,
    #[error("Invalid max input length: {0} (must be between 1 and 100000)")]
    InvalidMaxInput(usize),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid chunk size: {0} (must be between 100 and 8000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid retry count: {0} (must be between 0 and 10)")]
    InvalidRetries(u32),
    #[error("Invalid base delay: {0} (must be between 0 and 60 seconds)")]
    InvalidBaseDelay(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            bedrock: BedrockConfig::default(),
            chat: ChatConfig::default(),
            rag: RagConfig::default(),
            retry: RetryConfig::default(),
            base_dir: Self::config_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".bedrock-rag"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("bedrock-rag"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from the default configuration directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_from(config_dir)
    }

    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bedrock.validate()?;
        self.chat.validate()?;
        self.rag.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        self.bedrock.endpoint_url()
    }
}

fn validate_temperature(temperature: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTemperature(temperature))
    }
}

impl BedrockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() || self.region.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }

        self.endpoint_url()?;

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Runtime endpoint, either the configured override or the regional default
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url_str = self.endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", self.region)
        });
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn set_region(&mut self, region: String) -> Result<(), ConfigError> {
        let temp_config = BedrockConfig {
            region: region.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.region = region;
        Ok(())
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>) -> Result<(), ConfigError> {
        let temp_config = BedrockConfig {
            endpoint: endpoint.clone(),
            ..self.clone()
        };
        temp_config.endpoint_url()?;
        self.endpoint = endpoint;
        Ok(())
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }
}

impl ChatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_temperature(self.temperature)?;

        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::NoLanguages);
        }

        if !(1..=100_000).contains(&self.max_input_chars) {
            return Err(ConfigError::InvalidMaxInput(self.max_input_chars));
        }

        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_temperature(self.temperature)?;

        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(100..=8000).contains(&self.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }

    pub fn set_chunking(&mut self, chunk_size: usize, overlap: usize) -> Result<(), ConfigError> {
        let temp_config = RagConfig {
            chunk_size,
            chunk_overlap: overlap,
            ..self.clone()
        };
        temp_config.validate()?;
        self.chunk_size = chunk_size;
        self.chunk_overlap = overlap;
        Ok(())
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > 10 {
            return Err(ConfigError::InvalidRetries(self.max_retries));
        }

        if !(0.0..=60.0).contains(&self.base_delay_seconds) {
            return Err(ConfigError::InvalidBaseDelay(self.base_delay_seconds));
        }

        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.base_delay_seconds)
    }

    pub fn set_max_retries(&mut self, max_retries: u32) -> Result<(), ConfigError> {
        if max_retries > 10 {
            return Err(ConfigError::InvalidRetries(max_retries));
        }
        self.max_retries = max_retries;
        Ok(())
    }

    pub fn set_base_delay_seconds(&mut self, seconds: f64) -> Result<(), ConfigError> {
        if !(0.0..=60.0).contains(&seconds) {
            return Err(ConfigError::InvalidBaseDelay(seconds));
        }
        self.base_delay_seconds = seconds;
        Ok(())
    }
}
