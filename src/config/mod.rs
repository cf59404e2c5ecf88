//! Configuration management.

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_BASE_URL;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "LUMEN_API";

/// Prefix of environment overrides, e.g. `LUMEN__RATE_LIMITS__INTERVAL_MS`
const ENV_PREFIX: &str = "LUMEN";
const ENV_SEPARATOR: &str = "__";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service access
    #[serde(default)]
    pub api: ApiConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Paginated fetch settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Authentication token (defaults to `LUMEN_API`)
    #[serde(default = "default_token")]
    pub token: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_token() -> Option<String> {
    std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    crate::api::DEFAULT_USER_AGENT.to_string()
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory; caching is off when unset
    #[serde(default = "default_cache_dir")]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_dir(),
        }
    }
}

impl CacheConfig {
    /// Directory to cache into, or `None` when caching is disabled
    pub fn effective_dir(&self) -> Option<&Path> {
        if self.enabled {
            self.directory.as_deref()
        } else {
            None
        }
    }
}

fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("lumen-client"))
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum spacing between two network requests (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    2000
}

/// Paginated fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Fetch pages as concurrent tasks instead of one after another
    #[serde(default = "default_true")]
    pub concurrent: bool,

    /// Wait one rate-limit interval between concurrent task launches
    #[serde(default = "default_true")]
    pub space_launches: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            concurrent: true,
            space_launches: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for human output
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Load configuration from a file, with `LUMEN__<SECTION>__<KEY>`
/// environment variables taking precedence
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

/// First existing config file among `./lumen.toml` and
/// `<config dir>/lumen-client/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|p| p.is_file())
}

/// Default location written by `lumen config init`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lumen-client").join("config.toml"))
}

fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("lumen.toml")];
    candidates.extend(default_config_path());
    candidates
}
