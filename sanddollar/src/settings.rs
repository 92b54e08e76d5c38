use config::{Config, ConfigError, Environment, File};
use sanddollar_api::DEFAULT_BASE_URL;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Default, Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Live,
    Mock,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub data_mode: DataMode,
    #[serde(default)]
    pub plaid_link_enabled: bool,
    #[serde(default = "default_plaid_env")]
    pub plaid_env: String,
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_plaid_env() -> String {
    "sandbox".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_mode: DataMode::default(),
            plaid_link_enabled: false,
            plaid_env: default_plaid_env(),
        }
    }
}

impl Settings {
    /// Reads `config.toml` (or the file named by `SANDDOLLAR_CONFIG`) and
    /// `SANDDOLLAR_*` environment variables.
    pub fn new() -> Result<Self, SettingsError> {
        let config_path =
            std::env::var("SANDDOLLAR_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let settings = Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(
                Environment::with_prefix("SANDDOLLAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Settings from a single file, without the environment.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_base_url.is_empty() {
            return Err(SettingsError::Invalid("api_base_url is required".to_string()));
        }
        if !self.api_base_url.starts_with("http") {
            return Err(SettingsError::Invalid(
                "api_base_url must be a valid HTTP(S) URL".to_string(),
            ));
        }
        if self.plaid_link_enabled && self.plaid_env.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "plaid_env is required when plaid_link_enabled is set".to_string(),
            ));
        }
        Ok(())
    }
}
