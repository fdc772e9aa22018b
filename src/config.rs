//! Process configuration
//!
//! Read once at start-up from the environment (after `.env` is loaded by
//! the binaries) and passed down explicitly.

use crate::error::ReportError;
use crate::paths::OutputConfig;
use crate::Result;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Uppercase words that look like tickers but almost never are
pub const DEFAULT_TICKER_DENYLIST: &[&str] = &[
    "A", "I", "AI", "API", "CEO", "CFO", "ETF", "ESG", "GDP", "IPO", "IT", "KOSPI", "NIPA", "PDF",
    "PER", "PBR", "RAG", "ROE", "USA", "USD", "KRW", "VS",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output: OutputConfig,
    /// Base URL of the upstream data service; sources fail when unset
    pub report_api_base_url: Option<String>,
    pub request_timeout: Duration,
    pub ticker_denylist: Vec<String>,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            report_api_base_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ticker_denylist: DEFAULT_TICKER_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Reads only the keys it needs; unrelated variables are never decoded.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        config.output.override_dir = get("OUTPUT_DIR");
        config.report_api_base_url = get("REPORT_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string());

        if let Some(raw) = get("REPORT_API_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ReportError::ConfigError(format!("REPORT_API_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = get("TICKER_DENYLIST") {
            config.ticker_denylist = raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(raw) = get("PORT").or_else(|| get("API_PORT")) {
            config.port = raw
                .parse()
                .map_err(|_| ReportError::ConfigError(format!("Invalid port: {}", raw)))?;
        }

        Ok(config)
    }
}
