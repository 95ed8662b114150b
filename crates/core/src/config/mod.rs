//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DIMTS_*)
//! 2. TOML config file (if DIMTS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::manifest::DEFAULT_ASSETS;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DIMTS_*)
/// 2. TOML config file (if DIMTS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite bucket store.
    ///
    /// Set via DIMTS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version tag naming the current bucket. Bumping it per deploy is the
    /// sole mechanism for invalidating previously cached assets.
    ///
    /// Set via DIMTS_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// The application origin the gateway fronts.
    ///
    /// Set via DIMTS_UPSTREAM environment variable.
    #[serde(default = "default_upstream")]
    pub upstream: String,

    /// Address the proxy listens on.
    ///
    /// Set via DIMTS_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via DIMTS_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via DIMTS_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to buffer per response.
    ///
    /// Set via DIMTS_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Asset manifest paths, shell first.
    ///
    /// Set via DIMTS_ASSETS environment variable.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./dimts-cache.sqlite")
}

fn default_version_tag() -> String {
    "amharic-tts-v2".into()
}

fn default_upstream() -> String {
    "http://127.0.0.1:5001".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8606".into()
}

fn default_user_agent() -> String {
    "dimts-gw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|p| (*p).to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            version_tag: default_version_tag(),
            upstream: default_upstream(),
            listen_addr: default_listen_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            assets: default_assets(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DIMTS_`
    /// 2. TOML file from `DIMTS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DIMTS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DIMTS_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
