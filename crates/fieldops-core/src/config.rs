use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::fanout::DEFAULT_FANOUT_LIMIT;
use crate::workflow::{QUEUE_FETCH_LIMIT, Queue};

pub const CONFIG_PATH_ENV: &str = "FIELDOPS_CONFIG";
pub const API_URL_ENV: &str = "FIELDOPS_API_URL";
pub const TIMEOUT_ENV: &str = "FIELDOPS_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_queue_limit")]
    pub queue_limit: u32,
    #[serde(default)]
    pub default_queue: Queue,
    #[serde(default = "default_fanout_limit")]
    pub fanout_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_limit: default_queue_limit(),
            default_queue: Queue::default(),
            fanout_limit: default_fanout_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_onsite_alert_minutes")]
    pub onsite_alert_minutes: u32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            onsite_alert_minutes: default_onsite_alert_minutes(),
        }
    }
}

impl UserConfig {
    /// Apply `FIELDOPS_API_URL` / `FIELDOPS_TIMEOUT_SECS` on top of the file.
    ///
    /// Unparseable timeouts are ignored with a warning rather than failing
    /// the whole command.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.api.timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
    }
}

/// Location of the user config file: `FIELDOPS_CONFIG` or
/// `<config_dir>/fieldops/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("fieldops/config.toml"))
}

pub fn load_config_file(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the user config and apply environment overrides.
pub fn load_user_config() -> Result<UserConfig> {
    let mut config = match user_config_path() {
        Some(path) => load_config_file(&path)?,
        None => UserConfig::default(),
    };
    config.apply_env_overrides(|key| env::var(key).ok());
    Ok(config)
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_queue_limit() -> u32 {
    QUEUE_FETCH_LIMIT
}

const fn default_fanout_limit() -> usize {
    DEFAULT_FANOUT_LIMIT
}

const fn default_lookback_days() -> u32 {
    30
}

const fn default_onsite_alert_minutes() -> u32 {
    180
}
