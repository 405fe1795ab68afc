use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::core::report::DEFAULT_REPORT_WINDOW_HOURS;

pub const API_KEY_ENV: &str = "EXCHANGERATE_API_KEY";

/// Longest accepted report window, one hundred years.
pub const MAX_REPORT_WINDOW_HOURS: i64 = 100 * 366 * 24;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "ProviderConfig::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "ProviderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    fn default_base_url() -> String {
        "https://v6.exchangerate-api.com/v6".to_string()
    }

    fn default_timeout_secs() -> u64 {
        10
    }

    /// The configured key, or the one from the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("No provider api_key configured and {API_KEY_ENV} is not set"))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sample_interval_secs: u64,
    pub report_interval_secs: u64,
    pub report_window_hours: i64,
    pub autostart: bool,
}

impl ScheduleConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs.max(1))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    pub fn report_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.report_window_hours.clamp(1, MAX_REPORT_WINDOW_HOURS))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_REPORT_WINDOW_HOURS).contains(&self.report_window_hours) {
            anyhow::bail!(
                "schedule.report_window_hours must be between 1 and {MAX_REPORT_WINDOW_HOURS}, got {}",
                self.report_window_hours
            );
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 2 * 60 * 60,
            report_interval_secs: 24 * 60 * 60,
            report_window_hours: DEFAULT_REPORT_WINDOW_HOURS,
            autostart: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Keyspace,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "AppConfig::default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            base_currency: Self::default_base_currency(),
            schedule: ScheduleConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    fn default_base_currency() -> String {
        "EUR".to_string()
    }

    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("io", "fxtrack", "fxtrack")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.storage.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        Ok(self.data_path()?.join("store.json"))
    }

    pub fn report_path(&self) -> Result<PathBuf> {
        Ok(self.data_path()?.join("daily_report.json"))
    }

    pub fn keyspace_path(&self) -> Result<PathBuf> {
        Ok(self.data_path()?.join("keyspace"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .schedule
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
