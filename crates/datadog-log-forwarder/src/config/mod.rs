// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod log_level;
pub mod processing_rule;

use crate::config::log_level::LogLevel;
use crate::config::processing_rule::{parse_processing_rules, ProcessingRule};
use crate::logs::batcher::BatchLimits;
use crate::logs::constants;
use crate::retry::{self, RetryPolicy};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::error;

pub const DEFAULT_SITE: &str = "datadoghq.com";
pub const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SECRET_TTL_SECS: u64 = 300;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Forwarder configuration, read once at cold start.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// Datadog site (e.g. datadoghq.com, datadoghq.eu)
    pub site: String,
    /// Static API key. Takes precedence over the secret.
    pub api_key: Option<String>,
    /// Secrets Manager identifier holding the API key
    pub api_key_secret_arn: Option<String>,
    pub log_level: LogLevel,
    /// Intake base URL, without the `/api/v2/logs` path
    pub logs_dd_url: String,
    /// API base URL used by the health probe
    pub api_url: String,
    pub source: String,
    pub service: String,
    pub tags: Vec<String>,
    pub hostname: Option<String>,
    /// Per-request timeout, in seconds
    pub flush_timeout: u64,
    pub max_batch_entries: usize,
    pub max_batch_bytes: usize,
    pub max_log_bytes: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub secret_ttl_secs: u64,
    pub use_compression: bool,
    pub compression_level: i32,
    pub processing_rules: Option<Vec<ProcessingRule>>,
    pub proxy_https: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site: DEFAULT_SITE.to_string(),
            api_key: None,
            api_key_secret_arn: None,
            log_level: LogLevel::default(),
            logs_dd_url: build_fqdn_logs(DEFAULT_SITE),
            api_url: build_fqdn_api(DEFAULT_SITE),
            source: constants::DEFAULT_SOURCE.to_string(),
            service: constants::DEFAULT_SERVICE.to_string(),
            tags: Vec::new(),
            hostname: None,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT_SECS,
            max_batch_entries: constants::MAX_BATCH_ENTRIES_SIZE,
            max_batch_bytes: constants::MAX_CONTENT_SIZE_BYTES,
            max_log_bytes: constants::MAX_LOG_SIZE_BYTES,
            retry_max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: duration_ms(retry::DEFAULT_BASE_DELAY),
            retry_max_delay_ms: duration_ms(retry::DEFAULT_MAX_DELAY),
            secret_ttl_secs: DEFAULT_SECRET_TTL_SECS,
            use_compression: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            processing_rules: None,
            proxy_https: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("site", &self.site)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_secret_arn", &self.api_key_secret_arn)
            .field("log_level", &self.log_level)
            .field("logs_dd_url", &self.logs_dd_url)
            .field("api_url", &self.api_url)
            .field("source", &self.source)
            .field("service", &self.service)
            .field("tags", &self.tags)
            .field("hostname", &self.hostname)
            .field("flush_timeout", &self.flush_timeout)
            .field("max_batch_entries", &self.max_batch_entries)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .field("max_log_bytes", &self.max_log_bytes)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("secret_ttl_secs", &self.secret_ttl_secs)
            .field("use_compression", &self.use_compression)
            .field("compression_level", &self.compression_level)
            .field("processing_rules", &self.processing_rules)
            .field("proxy_https", &self.proxy_https)
            .finish()
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let site = env_var("DD_SITE").unwrap_or_else(|| DEFAULT_SITE.to_string());
        let logs_dd_url = env_var("DD_LOGS_CONFIG_LOGS_DD_URL")
            .map(|url| normalize_url(&url))
            .unwrap_or_else(|| build_fqdn_logs(&site));
        let api_url = env_var("DD_API_URL")
            .map(|url| normalize_url(&url))
            .unwrap_or_else(|| build_fqdn_api(&site));
        let log_level = log_level_from_env();
        let defaults = Config::default();

        let config = Config {
            api_key: env_var("DD_API_KEY"),
            api_key_secret_arn: env_var("DD_API_KEY_SECRET_ARN"),
            log_level,
            logs_dd_url,
            api_url,
            source: env_var("DD_SOURCE").unwrap_or(defaults.source),
            service: env_var("DD_SERVICE").unwrap_or(defaults.service),
            tags: env_var("DD_TAGS")
                .map(|val| parse_tags(&val))
                .unwrap_or_default(),
            hostname: env_var("DD_HOSTNAME"),
            flush_timeout: parse_env("DD_FLUSH_TIMEOUT", defaults.flush_timeout),
            max_batch_entries: parse_env(
                "DD_FORWARDER_MAX_BATCH_ENTRIES",
                defaults.max_batch_entries,
            ),
            max_batch_bytes: parse_env("DD_FORWARDER_MAX_BATCH_BYTES", defaults.max_batch_bytes),
            max_log_bytes: parse_env("DD_FORWARDER_MAX_LOG_BYTES", defaults.max_log_bytes),
            retry_max_attempts: parse_env(
                "DD_FORWARDER_RETRY_MAX_ATTEMPTS",
                defaults.retry_max_attempts,
            ),
            retry_base_delay_ms: parse_env(
                "DD_FORWARDER_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            ),
            retry_max_delay_ms: parse_env(
                "DD_FORWARDER_RETRY_MAX_DELAY_MS",
                defaults.retry_max_delay_ms,
            ),
            secret_ttl_secs: parse_env("DD_FORWARDER_SECRET_TTL_SECS", defaults.secret_ttl_secs),
            use_compression: parse_bool_env(
                "DD_LOGS_CONFIG_USE_COMPRESSION",
                defaults.use_compression,
            ),
            compression_level: parse_env(
                "DD_LOGS_CONFIG_COMPRESSION_LEVEL",
                defaults.compression_level,
            ),
            processing_rules: env_var("DD_LOGS_CONFIG_PROCESSING_RULES")
                .and_then(|val| parse_processing_rules(&val)),
            proxy_https: env_var("DD_PROXY_HTTPS").or_else(|| env_var("HTTPS_PROXY")),
            site,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "DD_SITE cannot be empty".to_string(),
            ));
        }

        if self.api_key.is_none() && self.api_key_secret_arn.is_none() {
            return Err(ConfigError::InvalidConfig(
                "one of DD_API_KEY or DD_API_KEY_SECRET_ARN must be set".to_string(),
            ));
        }

        if self.max_batch_entries == 0 || self.max_batch_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "batch limits must be greater than 0".to_string(),
            ));
        }

        if self.max_log_bytes >= self.max_batch_bytes {
            return Err(ConfigError::InvalidConfig(format!(
                "DD_FORWARDER_MAX_LOG_BYTES ({}) must be below DD_FORWARDER_MAX_BATCH_BYTES ({})",
                self.max_log_bytes, self.max_batch_bytes
            )));
        }

        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "DD_FORWARDER_RETRY_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    #[must_use]
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_entries: self.max_batch_entries,
            max_content_bytes: self.max_batch_bytes,
            max_log_bytes: self.max_log_bytes,
        }
    }

    #[must_use]
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout)
    }

    #[must_use]
    pub fn secret_ttl(&self) -> Duration {
        Duration::from_secs(self.secret_ttl_secs)
    }
}

#[must_use]
pub fn build_fqdn_logs(site: &str) -> String {
    format!("https://http-intake.logs.{site}")
}

#[must_use]
pub fn build_fqdn_api(site: &str) -> String {
    format!("https://api.{site}")
}

/// Adds a scheme when missing and strips trailing slashes.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Splits `DD_TAGS` on commas and whitespace.
fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads `LOG_LEVEL`, then `DD_LOG_LEVEL`.
///
/// Usable before the rest of the configuration so logging can be installed
/// first and configuration errors are not lost.
#[must_use]
pub fn log_level_from_env() -> LogLevel {
    env_var("LOG_LEVEL")
        .or_else(|| env_var("DD_LOG_LEVEL"))
        .map(|val| LogLevel::parse_lenient(&val))
        .unwrap_or_default()
}

/// Unset and blank variables are treated the same.
fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_var(name) {
        Some(val) => val.parse().unwrap_or_else(|e| {
            error!("Invalid value for {name}: '{val}' ({e}), using default");
            default
        }),
        None => default,
    }
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    match env_var(name).map(|val| val.to_lowercase()) {
        Some(val) => match val.as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                error!("Invalid boolean for {name}: '{val}', using default");
                default
            }
        },
        None => default,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
