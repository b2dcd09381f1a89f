//! # API Configuration
//!
//! Server, database, gateway and webhook settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_BIND_ADDR=0.0.0.0:8080                                  │
//! │     STOREFRONT_GATEWAY_SECRET_KEY=sk_live_...                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path taken from STOREFRONT_CONFIG                                  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     127.0.0.1:8080, ./storefront.db, https://api.stripe.com            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//!
//! [database]
//! path = "/var/lib/storefront/storefront.db"
//! max_connections = 8
//!
//! [gateway]
//! url = "https://api.stripe.com"
//! secret_key = "sk_test_..."
//! timeout_secs = 10
//! currency = "usd"
//!
//! [webhook]
//! secret = "whsec_..."
//! tolerance_secs = 300
//! ```
//!
//! Secrets are normally left out of the file and supplied through the
//! environment.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use storefront_core::DEFAULT_CURRENCY;
use storefront_db::DbConfig;

/// Environment variable naming the TOML file.
pub const CONFIG_PATH_ENV: &str = "STOREFRONT_CONFIG";

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a held lock before giving up.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./storefront.db")
}

fn default_max_connections() -> u32 {
    8
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the Stripe-compatible API.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// API secret key, sent as basic auth user name.
    #[serde(default)]
    pub secret_key: String,

    /// Bound on a single intent request.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// ISO currency code for every intent.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_gateway_url() -> String {
    storefront_payments::gateway::DEFAULT_GATEWAY_URL.to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            secret_key: String::new(),
            timeout_secs: default_gateway_timeout(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// Shared secret used to sign webhook payloads.
    #[serde(default)]
    pub secret: String,

    /// Accepted age of a signature timestamp.
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: u64,
}

fn default_tolerance() -> u64 {
    300
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            tolerance_secs: default_tolerance(),
        }
    }
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub webhook: WebhookSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file named by `STOREFRONT_CONFIG`
    /// 3. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                debug!("{} not set, using defaults", CONFIG_PATH_ENV);
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `STOREFRONT_*` overrides from `lookup`.
    ///
    /// Unparseable numeric values are logged and skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("STOREFRONT_BIND_ADDR") {
            debug!(addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(path) = lookup("STOREFRONT_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(url) = lookup("STOREFRONT_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.url = url;
        }

        if let Some(key) = lookup("STOREFRONT_GATEWAY_SECRET_KEY") {
            self.gateway.secret_key = key;
        }

        if let Some(secret) = lookup("STOREFRONT_WEBHOOK_SECRET") {
            self.webhook.secret = secret;
        }

        if let Some(currency) = lookup("STOREFRONT_CURRENCY") {
            self.gateway.currency = currency;
        }

        if let Some(value) = lookup("STOREFRONT_GATEWAY_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.gateway.timeout_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid STOREFRONT_GATEWAY_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = lookup("STOREFRONT_WEBHOOK_TOLERANCE_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.webhook.tolerance_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid STOREFRONT_WEBHOOK_TOLERANCE_SECS"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".into()));
        }

        if !self.gateway.url.starts_with("http://") && !self.gateway.url.starts_with("https://") {
            return Err(ConfigError::InvalidValue("gateway.url".into()));
        }

        if self.gateway.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "gateway.secret_key (STOREFRONT_GATEWAY_SECRET_KEY)".into(),
            ));
        }

        if self.webhook.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "webhook.secret (STOREFRONT_WEBHOOK_SECRET)".into(),
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("gateway.timeout_secs".into()));
        }

        let currency = &self.gateway.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidValue("gateway.currency".into()));
        }

        Ok(())
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue("server.bind_addr".into()))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_secs)
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook.tolerance_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_secrets() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.gateway.secret_key = "sk_test_123".to_string();
        config.webhook.secret = "whsec_123".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.gateway.currency, "usd");
        assert_eq!(config.gateway.timeout_secs, 10);
        assert_eq!(config.webhook.tolerance_secs, 300);
    }

    #[test]
    fn test_secrets_required() {
        assert!(matches!(
            ApiConfig::default().validate(),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(with_secrets().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = with_secrets();
        config.server.bind_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());

        let mut config = with_secrets();
        config.gateway.currency = "dollars".to_string();
        assert!(config.validate().is_err());

        let mut config = with_secrets();
        config.gateway.url = "ftp://gateway".to_string();
        assert!(config.validate().is_err());

        let mut config = with_secrets();
        config.gateway.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOREFRONT_BIND_ADDR", "0.0.0.0:9000"),
            ("STOREFRONT_GATEWAY_SECRET_KEY", "sk_env"),
            ("STOREFRONT_WEBHOOK_SECRET", "whsec_env"),
            ("STOREFRONT_GATEWAY_TIMEOUT_SECS", "3"),
            ("STOREFRONT_WEBHOOK_TOLERANCE_SECS", "not-a-number"),
            ("STOREFRONT_CURRENCY", "eur"),
        ]
        .into_iter()
        .collect();

        let mut config = ApiConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.gateway.secret_key, "sk_env");
        assert_eq!(config.webhook.secret, "whsec_env");
        assert_eq!(config.gateway_timeout(), Duration::from_secs(3));
        assert_eq!(config.webhook.tolerance_secs, 300);
        assert_eq!(config.gateway.currency, "eur");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront.toml");
        std::fs::write(
            &path,
            r#"
            [gateway]
            url = "http://localhost:12111"
            timeout_secs = 2

            [webhook]
            secret = "whsec_file"
            "#,
        )
        .unwrap();

        let config = ApiConfig::from_file(&path).unwrap();
        assert_eq!(config.gateway.url, "http://localhost:12111");
        assert_eq!(config.gateway.timeout_secs, 2);
        assert_eq!(config.gateway.currency, "usd");
        assert_eq!(config.webhook.secret, "whsec_file");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ApiConfig::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[gateway]"));
    }
}
