//! Configuration management for catalog-export
//!
//! Configuration is a single TOML file, `~/.catalog-export/config.toml` unless
//! `--config` names another one. Every field has a default, so an empty or
//! missing file yields a working in-memory setup:
//!
//! ```toml
//! [catalog]
//! backend = "mongodb"
//! uri = "mongodb://localhost:27017"
//! database = "shop"
//!
//! [export]
//! batch_size = 500
//! deadline_secs = 300
//!
//! [currency]
//! base = "RUB"
//! correction = "1.02"
//! rates = { USD = "0.0125" }
//!
//! [[clients]]
//! id = 7
//! discount_percent = "10"
//! region = "msk"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::export::ExportSettings;
use crate::profile::DEFAULT_SEPARATOR;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Known clients and their commercial terms
    #[serde(default)]
    pub clients: Vec<ClientConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where products and attribute definitions come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    /// A JSON file with `products` and `attributes` arrays
    Json,
    #[serde(alias = "mongo")]
    MongoDb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_backend")]
    pub backend: CatalogBackend,

    /// Catalog file for the JSON backend
    #[serde(default = "default_catalog_file")]
    pub file: PathBuf,

    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_products_collection")]
    pub products_collection: String,

    #[serde(default = "default_attributes_collection")]
    pub attributes_collection: String,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// JSON file holding export profiles
    #[serde(default = "default_profiles_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Products fetched per catalog page
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Products resolved concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Truncate exports running longer than this; 0 disables the deadline
    #[serde(default)]
    pub deadline_secs: u64,

    /// Multi-value separator for newly created profiles
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Strict mode for newly created profiles
    #[serde(default)]
    pub strict: bool,

    /// Show a progress bar for CLI exports
    #[serde(default = "default_progress")]
    pub progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency catalog prices are stored in
    #[serde(default = "default_base_currency")]
    pub base: String,

    /// Units of each currency per one base unit
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,

    /// Factor applied to every cross-currency conversion
    #[serde(default = "default_correction")]
    pub correction: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub id: i64,

    #[serde(default)]
    pub discount_percent: Decimal,

    /// Warehouse region used for regional stock
    #[serde(default)]
    pub region: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_backend() -> CatalogBackend {
    CatalogBackend::Json
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".catalog-export")
}

fn default_catalog_file() -> PathBuf {
    config_dir().join("catalog.json")
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "catalog".to_string()
}

fn default_products_collection() -> String {
    "products".to_string()
}

fn default_attributes_collection() -> String {
    "attributes".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

fn default_batch_size() -> usize {
    500
}

fn default_concurrency() -> usize {
    8
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_progress() -> bool {
    true
}

fn default_base_currency() -> String {
    "RUB".to_string()
}

fn default_correction() -> Decimal {
    Decimal::ONE
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            file: default_catalog_file(),
            uri: default_uri(),
            database: default_database(),
            products_collection: default_products_collection(),
            attributes_collection: default_attributes_collection(),
            max_pool_size: default_max_pool_size(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            path: default_profiles_path(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            deadline_secs: 0,
            separator: default_separator(),
            strict: false,
            progress: default_progress(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            base: default_base_currency(),
            rates: HashMap::new(),
            correction: default_correction(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string()).into()
            } else {
                crate::error::ExportError::Io(e)
            }
        })?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, or the default file when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size", "0"));
        }
        if self.export.concurrency == 0 {
            return Err(invalid("export.concurrency", "0"));
        }
        if self.currency.correction <= Decimal::ZERO {
            return Err(invalid("currency.correction", &self.currency.correction.to_string()));
        }
        if let Some((code, rate)) = self.currency.rates.iter().find(|(_, r)| **r <= Decimal::ZERO) {
            return Err(invalid(&format!("currency.rates.{code}"), &rate.to_string()));
        }
        for client in &self.clients {
            if client.discount_percent < Decimal::ZERO || client.discount_percent > Decimal::ONE_HUNDRED {
                return Err(invalid(
                    &format!("clients[{}].discount_percent", client.id),
                    &client.discount_percent.to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Runtime settings for the export engine
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            batch_size: self.export.batch_size,
            concurrency: self.export.concurrency,
            deadline: (self.export.deadline_secs > 0)
                .then(|| Duration::from_secs(self.export.deadline_secs)),
            progress: self.export.progress,
        }
    }
}

fn invalid(field: &str, value: &str) -> crate::error::ExportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.catalog.backend, CatalogBackend::Json);
        assert_eq!(config.export.separator, ", ");
        assert_eq!(config.currency.correction, Decimal::ONE);
        assert!(config.export_settings().deadline.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.export.batch_size, 500);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.clients.is_empty());
    }

    #[test]
    fn test_full_toml() {
        let config = Config::from_toml(
            r#"
            [catalog]
            backend = "mongodb"
            database = "shop"

            [export]
            concurrency = 4
            deadline_secs = 120

            [currency]
            base = "RUB"
            correction = "1.02"
            rates = { USD = "0.0125" }

            [[clients]]
            id = 7
            discount_percent = "10"
            region = "msk"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.backend, CatalogBackend::MongoDb);
        assert_eq!(config.catalog.database, "shop");
        assert_eq!(config.catalog.products_collection, "products");
        assert_eq!(config.currency.rates["USD"], Decimal::new(125, 4));
        assert_eq!(config.clients[0].region.as_deref(), Some("msk"));
        assert_eq!(config.logging.level.to_tracing_level(), tracing::Level::DEBUG);

        let settings = config.export_settings();
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.deadline, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[export]\nbatch_size = 0").unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::InvalidValue { .. })));

        let err = Config::from_toml("[[clients]]\nid = 1\ndiscount_percent = \"150\"").unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::InvalidValue { .. })));

        let err = Config::from_toml("[catalog]\nbackend = \"oracle\"").unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::FileNotFound(_))));
    }
}
