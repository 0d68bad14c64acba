// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults for the coordinator. Polling
//! intervals and the quorum timeout are constants next to the components
//! that use them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `MEDIATOR_URL` | Base URL of the mediator relay | `http://127.0.0.1:18080` |
//! | `HTTP_TIMEOUT_SECS` | Per-request mediator timeout | `10` |
//! | `DEDUP_CACHE_CAPACITY` | Max relay dedup entries per puller | `4096` |
//! | `SERVICE_NAME` | Advertised service name of this device | `relational-tss` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

/// Environment variable name for the mediator base URL.
pub const MEDIATOR_URL_ENV: &str = "MEDIATOR_URL";

/// Default mediator: the local relay a device starts for LAN-only sessions.
pub const DEFAULT_MEDIATOR_URL: &str = "http://127.0.0.1:18080";

/// Environment variable name for the HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_ENV: &str = "HTTP_TIMEOUT_SECS";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable name for the relay dedup cache bound.
pub const DEDUP_CACHE_CAPACITY_ENV: &str = "DEDUP_CACHE_CAPACITY";

/// Default dedup bound per puller.
pub const DEFAULT_DEDUP_CACHE_CAPACITY: usize = 4096;

/// Environment variable name for the advertised service name.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

pub const DEFAULT_SERVICE_NAME: &str = "relational-tss";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidValue {
                name: LOG_FORMAT_ENV,
                value: raw.to_string(),
            }),
        }
    }
}

/// Coordinator configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub mediator_url: String,
    pub http_timeout: Duration,
    pub dedup_cache_capacity: usize,
    pub service_name: String,
    pub log_format: LogFormat,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mediator_url: DEFAULT_MEDIATOR_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            dedup_cache_capacity: DEFAULT_DEDUP_CACHE_CAPACITY,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let http_timeout = match get(HTTP_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(parse_positive(HTTP_TIMEOUT_ENV, &raw)?),
            None => defaults.http_timeout,
        };
        let dedup_cache_capacity = match get(DEDUP_CACHE_CAPACITY_ENV) {
            Some(raw) => parse_positive(DEDUP_CACHE_CAPACITY_ENV, &raw)? as usize,
            None => defaults.dedup_cache_capacity,
        };
        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => LogFormat::parse(&raw)?,
            None => defaults.log_format,
        };

        Ok(Self {
            mediator_url: get(MEDIATOR_URL_ENV).unwrap_or(defaults.mediator_url),
            http_timeout,
            dedup_cache_capacity,
            service_name: get(SERVICE_NAME_ENV).unwrap_or(defaults.service_name),
            log_format,
        })
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CoordinatorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoordinatorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), CoordinatorConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            (MEDIATOR_URL_ENV, "https://relay.example.com"),
            (HTTP_TIMEOUT_ENV, "3"),
            (DEDUP_CACHE_CAPACITY_ENV, "128"),
            (SERVICE_NAME_ENV, "mac-B2"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();

        assert_eq!(config.mediator_url, "https://relay.example.com");
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.dedup_cache_capacity, 128);
        assert_eq!(config.service_name, "mac-B2");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[(MEDIATOR_URL_ENV, "   ")]).unwrap();
        assert_eq!(config.mediator_url, DEFAULT_MEDIATOR_URL);
    }

    #[test]
    fn rejects_zero_and_garbage_numbers() {
        assert!(load(&[(HTTP_TIMEOUT_ENV, "0")]).is_err());
        assert!(load(&[(DEDUP_CACHE_CAPACITY_ENV, "lots")]).is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert_eq!(
            load(&[(LOG_FORMAT_ENV, "xml")]).unwrap_err(),
            ConfigError::InvalidValue {
                name: LOG_FORMAT_ENV,
                value: "xml".to_string()
            }
        );
    }
}
