use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::file_service::{get_app_data_dir, read_json, write_json};
use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_ANALYTICS_HOST: &str = "https://eu.i.posthog.com";
pub const DEFAULT_CHAT_POLL_SECS: u64 = 20;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Build-time values, baked in by the release pipeline.
const BUILD_API_URL: Option<&str> = option_env!("INMO_API_URL");
const BUILD_ANALYTICS_KEY: Option<&str> = option_env!("INMO_ANALYTICS_KEY");
const BUILD_ANALYTICS_HOST: Option<&str> = option_env!("INMO_ANALYTICS_HOST");

/// User-editable settings persisted in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub analytics_key: Option<String>,
    #[serde(default)]
    pub analytics_host: Option<String>,
    #[serde(default)]
    pub chat_poll_secs: Option<u64>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

/// Settings after applying env overrides, the persisted file and fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub api_base_url: Url,
    pub analytics_key: Option<String>,
    pub analytics_host: String,
    pub chat_poll_interval: Duration,
    pub http_timeout: Duration,
}

fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join("config.json"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    Ok(read_json(path)?.unwrap_or_default())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    write_json(path, config)
}

pub fn set_base_url(url: &str) -> Result<()> {
    parse_base_url(url)?;
    let mut config = load_config().unwrap_or_default();
    config.api_base_url = Some(url.to_string());
    save_config(&config)
}

pub fn get_effective_config() -> Result<EffectiveConfig> {
    let config = load_config().unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config file: {}", e);
        Config::default()
    });
    resolve(&config, |key| std::env::var(key).ok())
}

/// Resolves each setting as: runtime env var, persisted file, build-time env
/// var, hard-coded fallback.
pub fn resolve<F>(config: &Config, env: F) -> Result<EffectiveConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    let api_base_url = non_empty(env("INMO_API_URL"))
        .or_else(|| non_empty(config.api_base_url.clone()))
        .or_else(|| BUILD_API_URL.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let analytics_key = non_empty(env("INMO_ANALYTICS_KEY"))
        .or_else(|| non_empty(config.analytics_key.clone()))
        .or_else(|| BUILD_ANALYTICS_KEY.map(str::to_string));

    let analytics_host = non_empty(env("INMO_ANALYTICS_HOST"))
        .or_else(|| non_empty(config.analytics_host.clone()))
        .or_else(|| BUILD_ANALYTICS_HOST.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_ANALYTICS_HOST.to_string());

    let chat_poll_secs = parse_secs(env("INMO_CHAT_POLL_SECS"), "INMO_CHAT_POLL_SECS")?
        .or(config.chat_poll_secs)
        .unwrap_or(DEFAULT_CHAT_POLL_SECS);

    let http_timeout_secs = parse_secs(env("INMO_HTTP_TIMEOUT_SECS"), "INMO_HTTP_TIMEOUT_SECS")?
        .or(config.http_timeout_secs)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

    Ok(EffectiveConfig {
        api_base_url: parse_base_url(&api_base_url)?,
        analytics_key,
        analytics_host,
        chat_poll_interval: Duration::from_secs(chat_poll_secs.max(1)),
        http_timeout: Duration::from_secs(http_timeout_secs.max(1)),
    })
}

fn parse_secs(raw: Option<String>, key: &str) -> Result<Option<u64>> {
    match raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} must be a number of seconds, got '{}'", key, value))),
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Config(format!("Invalid API base URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "API base URL must be http(s), got '{}'",
            raw
        )));
    }
    Ok(url)
}
