//! Configuration loading
//!
//! Resolution priority for each key:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;
pub const DEFAULT_SYNC_PACING_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
pub const DEFAULT_OBSERVER_CAPACITY: usize = 64;

pub const ENV_CONFIG: &str = "YTRANK_CONFIG";
pub const ENV_BIND: &str = "YTRANK_BIND";
pub const ENV_DATABASE: &str = "YTRANK_DATABASE";
pub const ENV_REMOTE_SERVER_URL: &str = "REMOTE_SERVER_URL";
pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub remote_server_url: Option<String>,
    pub youtube_api_key: Option<String>,
    pub log_level: Option<String>,
    pub cache_ttl_hours: Option<u64>,
    pub sync_pacing_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub heartbeat_secs: Option<u64>,
    pub observer_capacity: Option<usize>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub remote_server_url: Option<String>,
    pub youtube_api_key: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub database_path: PathBuf,
    /// Remote sync endpoint; sync tasks fail immediately when unset
    pub remote_server_url: Option<String>,
    /// YouTube Data API key; analysis of uncached playlists fails when unset
    pub youtube_api_key: Option<String>,
    pub log_level: String,
    pub cache_ttl: Duration,
    pub sync_pacing: Duration,
    pub request_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub observer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database_path: default_database_path(),
            remote_server_url: None,
            youtube_api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_HOURS * 3600),
            sync_pacing: Duration::from_millis(DEFAULT_SYNC_PACING_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            observer_capacity: DEFAULT_OBSERVER_CAPACITY,
        }
    }
}

impl Config {
    /// Resolve configuration from CLI, process environment, and TOML file
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let config_path = cli
            .config_path
            .clone()
            .or_else(|| non_blank(env(ENV_CONFIG)).map(PathBuf::from));
        let toml = load_toml_config(config_path.as_deref())?;
        Ok(Self::resolve_with(cli, &toml, env))
    }

    /// Resolve configuration from explicit sources
    pub fn resolve_with<F>(cli: &CliOverrides, toml: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |cli_value: &Option<String>, env_key: &str, file_value: &Option<String>| {
            non_blank(cli_value.clone())
                .or_else(|| non_blank(env(env_key)))
                .or_else(|| non_blank(file_value.clone()))
        };

        let defaults = Config::default();

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| non_blank(env(ENV_DATABASE)).map(PathBuf::from))
            .or_else(|| toml.database_path.clone())
            .unwrap_or(defaults.database_path);

        Self {
            bind_address: pick(&cli.bind_address, ENV_BIND, &toml.bind_address)
                .unwrap_or(defaults.bind_address),
            database_path,
            remote_server_url: pick(
                &cli.remote_server_url,
                ENV_REMOTE_SERVER_URL,
                &toml.remote_server_url,
            ),
            youtube_api_key: pick(
                &cli.youtube_api_key,
                ENV_YOUTUBE_API_KEY,
                &toml.youtube_api_key,
            ),
            log_level: pick(&cli.log_level, ENV_LOG_LEVEL, &toml.log_level)
                .unwrap_or(defaults.log_level),
            cache_ttl: toml
                .cache_ttl_hours
                .map(|h| Duration::from_secs(h * 3600))
                .unwrap_or(defaults.cache_ttl),
            sync_pacing: toml
                .sync_pacing_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.sync_pacing),
            request_timeout: toml
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            heartbeat_interval: toml
                .heartbeat_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            observer_capacity: toml
                .observer_capacity
                .filter(|c| *c > 0)
                .unwrap_or(defaults.observer_capacity),
        }
    }
}

/// Load the TOML config file
///
/// An explicit path that does not exist, or a missing default file, yields
/// defaults with a warning. A file that exists but does not parse is an error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => {
            debug!("No config directory available, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// `<config_dir>/ytrank/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ytrank").join("config.toml"))
}

/// `<data_local_dir>/ytrank/ytrank.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ytrank"))
        .unwrap_or_else(|| PathBuf::from("./ytrank_data"))
        .join("ytrank.db")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
