//! Configuration management using Figment
//!
//! Configuration is loaded from the following sources, highest precedence first:
//! 1. Environment variables understood by earlier deployments: `FLIGHT_API_KEY`,
//!    `API_BASE_URL`, `CACHE_TTL`, `CACHE_MAXSIZE`, `RATE_LIMIT`
//! 2. Prefixed environment variables: `FLIGHTS_<SECTION>__<KEY>`
//!    (for example `FLIGHTS_SERVICE__PORT=9000`)
//! 3. `./config.toml` (or the path given to [`Config::load_from`])
//! 4. Default values
//!
//! A `.env` file in the working directory is read into the process
//! environment before any of the above, overriding variables already set.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::middleware::rate_limit::RateLimitRule;

/// Environment variable names mapped onto configuration paths
const PLAIN_ENV_KEYS: &[(&str, &str)] = &[
    ("FLIGHT_API_KEY", "flight_api.api_key"),
    ("API_BASE_URL", "flight_api.base_url"),
    ("CACHE_TTL", "cache.ttl_secs"),
    ("CACHE_MAXSIZE", "cache.max_size"),
    ("RATE_LIMIT", "rate_limit.limit"),
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Schedule provider configuration
    pub flight_api: FlightApiConfig,

    /// Result cache configuration
    pub cache: CacheConfig,

    /// Per-client rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inbound request timeout in seconds
    ///
    /// Must exceed the upstream timeout times the attempt count; `validate`
    /// rejects anything shorter.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Schedule provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightApiConfig {
    /// API key; required
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the provider
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Attempts per fetch, including the first; only connection failures are retried
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl FlightApiConfig {
    /// Per-attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Put the cache in front of the aggregation pipeline
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds, measured from insertion
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of cached airports
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl CacheConfig {
    /// Entry lifetime as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Per-client rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Apply the limit
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Limit expression such as `30/minute` or `100 per hour`
    #[serde(default = "default_rate_limit")]
    pub limit: String,

    /// How often idle client buckets are dropped, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    /// Parse the limit expression
    pub fn rule(&self) -> Result<RateLimitRule> {
        self.limit.parse()
    }

    /// Cleanup interval as a Duration
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in KB
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,

    /// Enable response compression
    #[serde(default = "default_true")]
    pub compression: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_kb: default_body_limit_kb(),
            compression: true,
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "flight-origins".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    200
}

fn default_base_url() -> String {
    "https://api.flightapi.io".to_string()
}

fn default_upstream_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_size() -> usize {
    100
}

fn default_rate_limit() -> String {
    "30/minute".to_string()
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_body_limit_kb() -> usize {
    16
}

impl Config {
    /// Load configuration from `.env`, `./config.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration using `path` as the config file
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        match dotenvy::dotenv_override() {
            Ok(env_file) => tracing::debug!("Loaded environment from {}", env_file.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::InvalidConfig(format!("failed to read .env: {}", e))),
        }

        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
        }

        let config: Config = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered provider stack, without `.env` handling or validation
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FLIGHTS_").split("__"))
            .merge(plain_env())
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flight_api.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "FLIGHT_API_KEY is required but was not set".to_string(),
            ));
        }
        if self.flight_api.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "flight_api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.flight_api.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "flight_api.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "service.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let upstream_budget = self
            .flight_api
            .timeout_secs
            .saturating_mul(u64::from(self.flight_api.max_attempts));
        if self.service.timeout_secs <= upstream_budget {
            return Err(Error::InvalidConfig(format!(
                "service.timeout_secs ({}) must exceed flight_api.timeout_secs * flight_api.max_attempts ({})",
                self.service.timeout_secs, upstream_budget
            )));
        }
        self.rate_limit.rule()?;
        Ok(())
    }
}

fn plain_env() -> Env {
    Env::raw().filter_map(|key| {
        PLAIN_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_service_name(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
            },
            flight_api: FlightApiConfig {
                api_key: String::new(),
                base_url: default_base_url(),
                timeout_secs: default_upstream_timeout(),
                max_attempts: default_max_attempts(),
            },
            cache: CacheConfig {
                enabled: true,
                ttl_secs: default_cache_ttl(),
                max_size: default_cache_max_size(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                limit: default_rate_limit(),
                cleanup_interval_secs: default_cleanup_interval(),
            },
            middleware: MiddlewareConfig::default(),
        }
    }
}
