//! Controller configuration
//!
//! [`ControllerConfig`] is immutable once built. The deployment [`Environment`]
//! selects both the default API origin and the app-link URI scheme.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default polling cadence in milliseconds
pub const DEFAULT_REFRESH_RATE_MS: u64 = 500;

/// Deployment environment of the remote SSO broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Staging,
    #[default]
    Prod,
}

impl Environment {
    /// API origin used when no base URL override is configured
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Local => "http://172.16.0.203:1337",
            Self::Staging => "https://sandbox-api.blockpass.org",
            Self::Prod => "https://asia-api.blockpass.org",
        }
    }

    /// URI scheme of the mobile app for this environment
    #[must_use]
    pub fn app_link_prefix(self) -> &'static str {
        match self {
            Self::Local => "blockpass-local",
            Self::Staging => "blockpass-staging",
            Self::Prod => "blockpass",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Validated, immutable controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    base_url: String,
    client_id: String,
    env: Environment,
    refresh_rate: Duration,
}

impl ControllerConfig {
    /// Build a config for `client_id` with every other field defaulted
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingClientId`] if `client_id` is empty.
    pub fn new(client_id: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(client_id).build()
    }

    #[must_use]
    pub fn builder(client_id: impl Into<String>) -> ControllerConfigBuilder {
        ControllerConfigBuilder {
            client_id: client_id.into(),
            env: None,
            base_url: None,
            refresh_rate_ms: None,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn env(&self) -> Environment {
        self.env
    }

    #[must_use]
    pub fn refresh_rate(&self) -> Duration {
        self.refresh_rate
    }
}

/// Builder for [`ControllerConfig`]
#[derive(Debug, Clone)]
pub struct ControllerConfigBuilder {
    client_id: String,
    env: Option<Environment>,
    base_url: Option<String>,
    refresh_rate_ms: Option<u64>,
}

impl ControllerConfigBuilder {
    #[must_use]
    pub fn env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Override the environment's default API origin
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn refresh_rate_ms(mut self, refresh_rate_ms: u64) -> Self {
        self.refresh_rate_ms = Some(refresh_rate_ms);
        self
    }

    /// Validate and freeze the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `client_id` is empty
    /// - the base URL override is not an absolute URL
    /// - the refresh rate is zero
    pub fn build(self) -> Result<ControllerConfig, ConfigError> {
        let client_id = self.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }

        let env = self.env.unwrap_or_default();

        let base_url = match self.base_url {
            Some(url) if !url.trim().is_empty() => validate_base_url(url.trim())?,
            _ => env.default_base_url().to_string(),
        };

        let refresh_rate_ms = self.refresh_rate_ms.unwrap_or(DEFAULT_REFRESH_RATE_MS);
        if refresh_rate_ms == 0 {
            return Err(ConfigError::InvalidRefreshRate(refresh_rate_ms));
        }

        Ok(ControllerConfig {
            base_url,
            client_id,
            env,
            refresh_rate: Duration::from_millis(refresh_rate_ms),
        })
    }
}

fn validate_base_url(url: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::new("svc1").unwrap();
        assert_eq!(config.client_id(), "svc1");
        assert_eq!(config.env(), Environment::Prod);
        assert_eq!(config.base_url(), "https://asia-api.blockpass.org");
        assert_eq!(config.refresh_rate(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_client_id_rejected() {
        assert_eq!(
            ControllerConfig::new("").unwrap_err(),
            ConfigError::MissingClientId
        );
        assert_eq!(
            ControllerConfig::new("   ").unwrap_err(),
            ConfigError::MissingClientId
        );
    }

    #[test]
    fn test_env_selects_default_base_url() {
        let config = ControllerConfig::builder("svc1")
            .env(Environment::Staging)
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "https://sandbox-api.blockpass.org");
    }

    #[test]
    fn test_base_url_override_is_trimmed() {
        let config = ControllerConfig::builder("svc1")
            .env(Environment::Local)
            .base_url("http://localhost:1337/")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "http://localhost:1337");
        assert_eq!(config.env(), Environment::Local);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ControllerConfig::builder("svc1")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = ControllerConfig::builder("svc1")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_zero_refresh_rate_rejected() {
        let err = ControllerConfig::builder("svc1")
            .refresh_rate_ms(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidRefreshRate(0));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("staging".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!(" PROD ".parse::<Environment>(), Ok(Environment::Prod));
        assert!(matches!(
            "qa".parse::<Environment>(),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_app_link_prefixes_are_distinct() {
        assert_eq!(Environment::Local.app_link_prefix(), "blockpass-local");
        assert_eq!(Environment::Staging.app_link_prefix(), "blockpass-staging");
        assert_eq!(Environment::Prod.app_link_prefix(), "blockpass");
    }
}
