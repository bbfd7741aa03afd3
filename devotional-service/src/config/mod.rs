//! Configuration for devotional-service.
//!
//! Every recognized key is read once at startup. Required keys that are
//! missing or blank fail startup instead of failing the first job run.

use secrecy::SecretString;
use service_core::config::{self as core_config, env_or, env_parse_or, required_env};
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone)]
pub struct DevotionalConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub gemini: GeminiSettings,
    pub cron: CronConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_url: String,
    pub api_key: Arc<SecretString>,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl GeminiSettings {
    /// Retry policy for jobs that retry transient generation failures.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_attempts, self.retry_base_delay)
    }
}

#[derive(Debug, Clone)]
pub struct CronConfig {
    pub secret: Arc<SecretString>,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pending rows selected per invocation.
    pub page_size: i64,
    /// Concurrent generations per chunk.
    pub chunk_size: usize,
    /// Recent references fed back into prompts.
    pub recent_reference_limit: i64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            chunk_size: 5,
            recent_reference_limit: 10,
        }
    }
}

impl DevotionalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = BatchConfig::default();

        let config = Self {
            common,
            service_name: env_or("SERVICE_NAME", "devotional-service"),
            service_version: env_or("SERVICE_VERSION", env!("CARGO_PKG_VERSION")),
            log_level: env_or("LOG_LEVEL", "info"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: required_env("DATABASE_URL")?,
                max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: env_parse_or("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            gemini: GeminiSettings {
                api_url: env_or("GEMINI_API_URL", DEFAULT_GEMINI_API_URL),
                api_key: Arc::new(SecretString::new(required_env("GEMINI_API_KEY")?)),
                timeout: Duration::from_secs(env_parse_or("GEMINI_TIMEOUT_SECS", 120)?),
                max_attempts: env_parse_or("GEMINI_MAX_ATTEMPTS", 3)?,
                retry_base_delay: Duration::from_millis(env_parse_or(
                    "GEMINI_RETRY_BASE_DELAY_MS",
                    2000,
                )?),
            },
            cron: CronConfig {
                secret: Arc::new(SecretString::new(required_env("CRON_SECRET")?)),
            },
            batch: BatchConfig {
                page_size: env_parse_or("PENDING_PAGE_SIZE", defaults.page_size)?,
                chunk_size: env_parse_or("GENERATION_CHUNK_SIZE", defaults.chunk_size)?,
                recent_reference_limit: env_parse_or(
                    "RECENT_REFERENCE_LIMIT",
                    defaults.recent_reference_limit,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.gemini.max_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GEMINI_MAX_ATTEMPTS must be at least 1"
            )));
        }
        if self.batch.chunk_size == 0 || self.batch.page_size <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PENDING_PAGE_SIZE and GENERATION_CHUNK_SIZE must be positive"
            )));
        }
        Ok(())
    }
}
