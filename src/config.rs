use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "PLAYSTORE_TRACKER_CONFIG";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// `postgres://...` for PostgreSQL, `sqlite://path` or a bare path for SQLite
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub play_store: PlayStoreConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// First port tried when binding
    #[serde(default = "default_port")]
    pub port: u16,

    /// How many consecutive ports to try before giving up
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlayStoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interface language passed as `hl`
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Timeout for search requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retries for 429/5xx and connect failures; 0 disables
    #[serde(default)]
    pub max_retries: usize,

    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Minimum spacing between two external search calls
    #[serde(default = "default_search_interval")]
    pub search_interval_ms: u64,

    /// Minimum spacing between countries in a multi-country sweep
    #[serde(default = "default_country_interval")]
    pub country_interval_ms: u64,

    /// Default `limit` for single search and single country requests
    #[serde(default = "default_request_limit")]
    pub request_limit: usize,

    /// Per-query limit for the multi-query sweeps started over HTTP
    #[serde(default = "default_sweep_limit")]
    pub sweep_limit: usize,

    /// Per-query limit inside a full scrape
    #[serde(default = "default_full_scrape_limit")]
    pub full_scrape_limit: usize,

    /// Run a full scrape periodically when set
    #[serde(default)]
    pub full_scrape_interval_secs: Option<u64>,
}

fn default_database_url() -> String { "sqlite://playstore.db".to_string() }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_port_attempts() -> u16 { 11 }
fn default_base_url() -> String { crate::play_store::BASE_URL.to_string() }
fn default_lang() -> String { "en".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}
fn default_initial_retry_delay() -> u64 { 500 }
fn default_max_retry_delay() -> u64 { 8000 }
fn default_search_interval() -> u64 { 500 }
fn default_country_interval() -> u64 { 1000 }
fn default_request_limit() -> usize { 50 }
fn default_sweep_limit() -> usize { 30 }
fn default_full_scrape_limit() -> usize { 100 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_attempts: default_port_attempts(),
        }
    }
}

impl Default for PlayStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            lang: default_lang(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            max_retries: 0,
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_interval_ms: default_search_interval(),
            country_interval_ms: default_country_interval(),
            request_limit: default_request_limit(),
            sweep_limit: default_sweep_limit(),
            full_scrape_limit: default_full_scrape_limit(),
            full_scrape_interval_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            server: ServerConfig::default(),
            play_store: PlayStoreConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` (or the file named by `PLAYSTORE_TRACKER_CONFIG`),
    /// falling back to defaults when it does not exist, then applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = Self::load_from(Path::new(&path))?;
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            cfg.database_url = url;
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str::<Config>(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl PlayStoreConfig {
    /// Create the outbound HTTP client from this configuration
    pub fn create_http_client(&self) -> Result<crate::http_client::HttpClient, reqwest::Error> {
        use crate::http_client::{HttpClient, HttpClientConfig};

        HttpClient::with_config(HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            max_retries: self.max_retries,
            initial_retry_delay_ms: self.initial_retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
        })
    }
}
