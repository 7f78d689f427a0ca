use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::cluster::ClusterSet;
use crate::pagination::DEFAULT_PER_PAGE;

pub const BIND_ENV: &str = "VANGUARD_BIND";
pub const PER_PAGE_ENV: &str = "VANGUARD_PER_PAGE";
pub const CLUSTERED_ENV: &str = "VANGUARD_CLUSTERED_CATEGORIES";
pub const WEBHOOK_URL_ENV: &str = "VANGUARD_WEBHOOK_URL";
pub const WEBHOOK_SECRET_ENV: &str = "VANGUARD_WEBHOOK_SECRET";
pub const CORS_ORIGINS_ENV: &str = "VANGUARD_CORS_ORIGINS";

pub const DEFAULT_BIND: &str = "0.0.0.0:8090";
/// Backoff between webhook attempts; one attempt more than there are delays.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<Vec<u8>>,
    pub retry_delays: Vec<Duration>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { webhook_url: None, webhook_secret: None, retry_delays: DEFAULT_RETRY_DELAYS.to_vec() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub per_page: usize,
    pub clustered: ClusterSet,
    pub cors_origins: Vec<String>,
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            per_page: DEFAULT_PER_PAGE,
            clustered: ClusterSet::default(),
            cors_origins: Vec::new(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(bind) = get(BIND_ENV) {
            cfg.bind = bind;
        }
        if let Some(raw) = get(PER_PAGE_ENV) {
            cfg.per_page = parse_per_page(PER_PAGE_ENV, &raw)?;
        }
        if let Some(raw) = get(CLUSTERED_ENV) {
            cfg.clustered = ClusterSet::new(split_list(&raw));
        }
        if let Some(raw) = get(CORS_ORIGINS_ENV) {
            cfg.cors_origins = split_list(&raw);
        }
        cfg.notify.webhook_url = get(WEBHOOK_URL_ENV);
        cfg.notify.webhook_secret = get(WEBHOOK_SECRET_ENV).map(String::into_bytes);
        Ok(cfg)
    }
}

pub fn parse_per_page(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value: raw.to_string() }),
    }
}

/// Comma separated list with blanks removed.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
