//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use issue_bridge_core::{asana::AsanaClientConfig, github::GithubClientConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// System-wide configuration file (optional)
pub const SYSTEM_CONFIG_PATH: &str = "/etc/issue-bridge/service";

/// Deployment-local configuration file (optional)
pub const LOCAL_CONFIG_PATH: &str = "config/service";

/// Prefix for configuration environment variables, e.g. `IB__SERVER__PORT`
pub const ENV_PREFIX: &str = "IB";

/// Service configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook endpoint settings
    pub webhooks: WebhookConfig,

    /// GitHub API access and webhook secret
    pub github: GithubClientConfig,

    /// Asana API access and task placement
    pub asana: AsanaClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Webhook endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Path GitHub delivers webhooks to
    pub endpoint_path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from files and the environment.
    ///
    /// Sources are applied in order, later sources overriding earlier ones:
    ///  1. `/etc/issue-bridge/service.{yaml,toml,json}` (optional)
    ///  2. `./config/service.{yaml,toml,json}` (optional)
    ///  3. `explicit_path`, when given (required)
    ///  4. Environment variables prefixed `IB__` with `__` as the separator,
    ///     e.g. `IB__ASANA__ACCESS_TOKEN`
    ///
    /// The result is not validated; call [`ServiceConfig::validate`].
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(SYSTEM_CONFIG_PATH).required(false))
            .add_source(config::File::with_name(LOCAL_CONFIG_PATH).required(false));

        if let Some(path) = explicit_path {
            info!(path = %path.display(), "Loading configuration from explicit path");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "server.host must not be empty".to_string(),
            });
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path '{}' must start with '/'",
                    self.webhooks.endpoint_path
                ),
            });
        }

        if self.webhooks.endpoint_path == "/health" {
            return Err(ConfigError::Invalid {
                message: "webhooks.endpoint_path must not shadow /health".to_string(),
            });
        }

        self.github.validate()?;
        self.asana.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
