#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_API_KEY_NAME: &str = "OPENAI_API_KEY";
pub const DEFAULT_PERSONA: &str =
    "You are a friendly and knowledgeable NPC in the game 'Chronicles of Etheria'.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub npc: NpcConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Name of the entry in the secrets file that holds the API key
    pub api_key_name: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            api_key_name: DEFAULT_API_KEY_NAME.to_string(),
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NpcConfig {
    /// System prompt sent ahead of every question
    pub persona: String,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key name: {0} (cannot be empty or contain '=')")]
    InvalidKeyName(String),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid persona: cannot be empty")]
    EmptyPersona,
    #[error("Invalid secrets file: {0}")]
    InvalidSecrets(String),
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
            openai: OpenAiConfig::default(),
            npc: NpcConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Default configuration directory, `~/.npc-lore`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".npc-lore"))
            .or_else(|| dirs::data_dir().map(|data| data.join("npc-lore")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
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
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        if self.npc.persona.trim().is_empty() {
            return Err(ConfigError::EmptyPersona);
        }
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// `KEY=VALUE` credentials file
    #[inline]
    pub fn secrets_path(&self) -> PathBuf {
        self.get_base_dir().join("secrets.txt")
    }

    /// Compiled knowledge sentences, input to the vector store build
    #[inline]
    pub fn knowledge_path(&self) -> PathBuf {
        self.get_base_dir().join("knowledge_base.json")
    }

    /// Embedded vector snapshot loaded by the serving process
    #[inline]
    pub fn vector_db_path(&self) -> PathBuf {
        self.get_base_dir().join("vector_db.json")
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if self.api_key_name.trim().is_empty() || self.api_key_name.contains('=') {
            return Err(ConfigError::InvalidKeyName(self.api_key_name.clone()));
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// API root with a trailing slash so endpoint names join beneath it
    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let mut url_str = self.base_url.trim().to_string();
        if !url_str.ends_with('/') {
            url_str.push('/');
        }

        let url = Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }
        Ok(url)
    }

    #[inline]
    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        let temp_config = OpenAiConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        temp_config.api_url()?;
        self.base_url = base_url;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_timeout_seconds(&mut self, timeout: u64) -> Result<(), ConfigError> {
        if !(1..=300).contains(&timeout) {
            return Err(ConfigError::InvalidTimeout(timeout));
        }
        self.timeout_seconds = timeout;
        Ok(())
    }
}
