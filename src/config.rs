//! Runtime configuration, read from the environment (and `.env`).

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const ENV_API_URL: &str = "HACKHUB_API_URL";
pub const ENV_PROVIDERS: &str = "HACKHUB_PROVIDERS";
pub const ENV_STORE_PATH: &str = "HACKHUB_STORE_PATH";
pub const ENV_LOG_FILE: &str = "HACKHUB_LOG_FILE";
pub const ENV_DEFAULT_COUNT: &str = "HACKHUB_DEFAULT_COUNT";

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_PROVIDERS: &[&str] = &["mlh", "devpost"];
const DEFAULT_STORE_PATH: &str = "hackhub-events.json";
const DEFAULT_LOG_FILE: &str = "hackhub-stream.log";
const DEFAULT_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the scraper API.
    pub api_base_url: String,
    /// One stream source is opened per provider id, in this order.
    pub providers: Vec<String>,
    /// Where the aggregate is persisted between runs.
    pub store_path: PathBuf,
    /// Log output; stdout belongs to the terminal UI.
    pub log_file: PathBuf,
    /// Initial result-count hint in the search form.
    pub default_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            default_count: DEFAULT_COUNT,
        }
    }
}

impl Config {
    /// Load from process environment variables, after merging `.env` if one
    /// exists.  Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(list) = lookup(ENV_PROVIDERS) {
            config.providers = parse_providers(&list);
        }
        if let Some(path) = lookup(ENV_STORE_PATH) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_LOG_FILE) {
            config.log_file = PathBuf::from(path);
        }
        if let Some(count) = lookup(ENV_DEFAULT_COUNT) {
            config.default_count = count
                .trim()
                .parse()
                .with_context(|| format!("{ENV_DEFAULT_COUNT} must be a non-negative integer, got {count:?}"))?;
        }

        Ok(config)
    }
}

/// Split a comma-separated provider list, dropping blanks.
fn parse_providers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
