use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_HTTP_MAX_RETRIES, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PORT,
    HISTORY_END, HISTORY_START, ROW_WINDOW, YAHOO_BASE_URL,
};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Half-open history window `[start, end)` requested from the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(AppError::Config(format!(
                "History start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        // Both constants are valid ISO dates
        Self {
            start: parse_date("HISTORY_START", HISTORY_START).unwrap_or_default(),
            end: parse_date("HISTORY_END", HISTORY_END).unwrap_or_default(),
        }
    }
}

/// Runtime configuration, read from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port for `serve`
    pub port: u16,

    /// Base URL of the Yahoo Finance chart API
    pub yahoo_base_url: String,

    /// Per-request timeout for the data source
    pub http_timeout: Duration,

    /// Retry budget per ticker fetch
    pub max_retries: u32,

    /// Series cache TTL (zero disables the cache)
    pub cache_ttl: Duration,

    /// History window fetched for every ticker
    pub history: DateRange,

    /// Rows kept per ticker after the pivot
    pub row_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            yahoo_base_url: YAHOO_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_HTTP_MAX_RETRIES,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            history: DateRange::default(),
            row_window: ROW_WINDOW,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let history_start = parse_date(
            "HISTORY_START",
            &lookup("HISTORY_START").unwrap_or_else(|| HISTORY_START.to_string()),
        )?;
        let history_end = parse_date(
            "HISTORY_END",
            &lookup("HISTORY_END").unwrap_or_else(|| HISTORY_END.to_string()),
        )?;

        let yahoo_base_url = lookup("YAHOO_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| YAHOO_BASE_URL.to_string());

        if !yahoo_base_url.starts_with("http://") && !yahoo_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid YAHOO_BASE_URL: must start with http:// or https://, got: '{}'",
                yahoo_base_url
            )));
        }

        let row_window: usize = parse_var(&lookup, "ROW_WINDOW", ROW_WINDOW)?;
        if row_window == 0 {
            return Err(AppError::Config("ROW_WINDOW must be at least 1".to_string()));
        }

        Ok(Self {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            yahoo_base_url,
            http_timeout: Duration::from_secs(parse_var(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            max_retries: parse_var(&lookup, "HTTP_MAX_RETRIES", DEFAULT_HTTP_MAX_RETRIES)?,
            cache_ttl: Duration::from_secs(parse_var(
                &lookup,
                "CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            history: DateRange::new(history_start, history_end)?,
            row_window,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}='{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::Config(format!("Invalid {}='{}': {}", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 9876);
        assert_eq!(config.row_window, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.history.start, NaiveDate::from_ymd_opt(2004, 1, 1).unwrap());
        assert_eq!(config.history.end, NaiveDate::from_ymd_opt(2024, 8, 25).unwrap());
        assert_eq!(config.yahoo_base_url, "https://query2.finance.yahoo.com");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("CACHE_TTL_SECS", "0"),
            ("YAHOO_BASE_URL", "http://localhost:3000/ "),
            ("HISTORY_START", "2010-01-01"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.yahoo_base_url, "http://localhost:3000");
        assert_eq!(config.history.start, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
    }

    #[test]
    fn test_invalid_values() {
        assert!(AppConfig::from_lookup(lookup_from(&[("PORT", "abc")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("ROW_WINDOW", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("YAHOO_BASE_URL", "ftp://x")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("HISTORY_END", "2003-01-01")])).is_err());
    }

    #[test]
    fn test_default_range_matches_history_constants() {
        let range = DateRange::default();
        assert_eq!(range.start.format("%Y-%m-%d").to_string(), HISTORY_START);
        assert_eq!(range.end.format("%Y-%m-%d").to_string(), HISTORY_END);
        assert_eq!(AppConfig::default().history, range);
    }

    #[test]
    fn test_date_range_is_half_open() {
        let range = DateRange::default();
        assert!(range.contains(NaiveDate::from_ymd_opt(2004, 1, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 8, 24).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 8, 25).unwrap()));
    }
}
