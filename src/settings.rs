use crate::config::{ControllerConfig, Environment, DEFAULT_REFRESH_RATE_MS};
use crate::error::ConfigError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Directory whose `Settings.toml` overrides the one in the working directory
pub const SETTINGS_DIR_ENV: &str = "SSOLINK_SETTINGS_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SsoSettings {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Identifier of the integrating service; required
    #[serde(default)]
    pub client_id: String,
    /// Deployment environment (`local`, `staging`, `prod`)
    #[serde(default)]
    pub env: Environment,
    /// API origin override; the environment's default is used when unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// Polling cadence in milliseconds
    #[serde(default = "default_refresh_rate_ms")]
    pub refresh_rate_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

// Helper functions for serde defaults
fn default_refresh_rate_ms() -> u64 { DEFAULT_REFRESH_RATE_MS }

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            env: Environment::default(),
            base_url: None,
            refresh_rate_ms: DEFAULT_REFRESH_RATE_MS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SsoSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Settings.toml in `SSOLINK_SETTINGS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    /// - `SSO_ENV` names an unknown environment
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings)?;
        Ok(settings)
    }

    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            info!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(settings_dir) = std::env::var(SETTINGS_DIR_ENV) {
            let dir_path = Path::new(&settings_dir).join("Settings.toml");
            if dir_path.exists() {
                settings = Self::from_file(&dir_path)?;
                info!("✓ Overriding settings from {}", dir_path.display());
            } else {
                info!(
                    "ℹ {SETTINGS_DIR_ENV} set but no Settings.toml found at: {}",
                    dir_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    ///
    /// # Errors
    ///
    /// Returns an error if `SSO_ENV` names an unknown environment.
    pub fn apply_env_overrides(settings: &mut Self) -> Result<(), ConfigError> {
        Self::apply_client_env_overrides(&mut settings.client)?;
        Self::apply_logging_env_overrides(&mut settings.logging);
        Ok(())
    }

    /// Apply environment overrides for client settings
    ///
    /// # Errors
    ///
    /// Returns an error if `SSO_ENV` names an unknown environment.
    pub fn apply_client_env_overrides(client: &mut ClientSettings) -> Result<(), ConfigError> {
        if let Ok(client_id) = std::env::var("SSO_CLIENT_ID") {
            client.client_id = client_id;
        }
        if let Ok(env) = std::env::var("SSO_ENV") {
            client.env = env.parse()?;
        }
        if let Ok(base_url) = std::env::var("SSO_BASE_URL") {
            client.base_url = Some(base_url);
        }
        if let Ok(value_str) = std::env::var("SSO_REFRESH_RATE_MS") {
            if let Ok(value) = value_str.parse::<u64>() {
                client.refresh_rate_ms = value;
            }
        }
        Ok(())
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging: &mut LoggingSettings) {
        if let Ok(level) = std::env::var("SSO_LOG_LEVEL") {
            logging.level = level;
        }
    }

    /// Validate the client section into a controller configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the client id is missing, the base URL is invalid
    /// or the refresh rate is zero.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let mut builder = ControllerConfig::builder(self.client.client_id.clone())
            .env(self.client.env)
            .refresh_rate_ms(self.client.refresh_rate_ms);
        if let Some(base_url) = &self.client.base_url {
            builder = builder.base_url(base_url.clone());
        }
        builder.build()
    }
}
