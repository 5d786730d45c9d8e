use std::env;
use std::time::Duration;

use crate::fetcher::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Endpoint serving campaign category configuration; classification stays "offen" without it
    pub categories_url: Option<String>,
    pub category_refresh_minutes: u64,
    pub source_cookie: Option<String>,
    pub fetch_max_redirects: usize,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", 8080)?,
            categories_url: optional_var("CATEGORIES_URL"),
            category_refresh_minutes: parse_var("CATEGORY_REFRESH_MINUTES", 5)?,
            source_cookie: optional_var("SOURCE_COOKIE"),
            fetch_max_redirects: parse_var("FETCH_MAX_REDIRECTS", DEFAULT_MAX_REDIRECTS)?,
            fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// The cookie is a credential; keep it out of startup logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("categories_url", &self.categories_url)
            .field("category_refresh_minutes", &self.category_refresh_minutes)
            .field("source_cookie", &self.source_cookie.as_ref().map(|_| "<redacted>"))
            .field("fetch_max_redirects", &self.fetch_max_redirects)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
