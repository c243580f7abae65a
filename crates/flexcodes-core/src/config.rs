//! Application configuration management.
//!
//! Configuration is stored at `~/.config/flexcodes/config.json`. Every field
//! is optional on disk; `FLEXCODES_BASE_URL` and `FLEXCODES_CACHE_VERSION`
//! override the file when set.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::loader::DATASET_NAME;
use crate::models::{TypeFilter, DEFAULT_TYPE};
use crate::worker::CACHE_VERSION;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "flexcodes";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Collapse-state file name
const STATE_FILE: &str = "collapse.json";

const BASE_URL_ENV: &str = "FLEXCODES_BASE_URL";
const CACHE_VERSION_ENV: &str = "FLEXCODES_CACHE_VERSION";

/// Filter buttons shown when the config does not list any
const DEFAULT_FILTERS: &[&str] = &["Apartments", "Condos", "Houses", "All"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Location the dataset and shell are served from
    pub base_url: Option<String>,
    /// Dataset file name, resolved against `base_url`
    pub dataset_name: Option<String>,
    /// Offline cache generation tag
    pub cache_version: Option<String>,
    /// Filter button labels, "All" is the wildcard
    pub filters: Vec<String>,
    /// Filter active at startup
    pub default_filter: Option<String>,
    /// Set to false to fetch without the offline cache
    pub offline_cache: Option<bool>,
}

impl Config {
    /// Load from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = Some(url.trim().to_string());
            }
        }
        if let Ok(version) = std::env::var(CACHE_VERSION_ENV) {
            if !version.trim().is_empty() {
                self.cache_version = Some(version.trim().to_string());
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Base URL the dataset is resolved against. A URL without a trailing
    /// slash names a page; its directory is used.
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No base URL configured (set {})", BASE_URL_ENV))?;
        Url::parse(raw).with_context(|| format!("Invalid base URL: {}", raw))
    }

    pub fn dataset_name(&self) -> &str {
        self.dataset_name.as_deref().unwrap_or(DATASET_NAME)
    }

    pub fn cache_version(&self) -> &str {
        self.cache_version.as_deref().unwrap_or(CACHE_VERSION)
    }

    pub fn offline_cache_enabled(&self) -> bool {
        self.offline_cache.unwrap_or(true)
    }

    /// Filter buttons in display order
    pub fn filters(&self) -> Vec<TypeFilter> {
        let labels: Vec<&str> = if self.filters.is_empty() {
            DEFAULT_FILTERS.to_vec()
        } else {
            self.filters.iter().map(String::as_str).collect()
        };
        labels.into_iter().map(TypeFilter::from_label).collect()
    }

    pub fn default_filter(&self) -> TypeFilter {
        TypeFilter::from_label(self.default_filter.as_deref().unwrap_or(DEFAULT_TYPE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Durable location for UI state such as collapsed groups
    pub fn state_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STATE_FILE))
    }
}
