use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{grid::IntensityTable, model::Location, provider::ProviderId};

/// Environment variable that overrides the ipapi key from the config file.
pub const IPAPI_KEY_ENV: &str = "CO2_IPAPI_KEY";

/// Configuration for a single geolocation provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override of the provider's base URL, e.g. for a self-hosted mirror.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, "ipapi" or "fixed".
    pub default_provider: Option<String>,

    /// JSON intensity dataset replacing the built-in table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,

    /// Example TOML:
    /// [providers.ipapi]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Location reported by the `fixed` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_location: Option<Location>,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    /// Without a configured default, ipapi is used.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            None => Ok(ProviderId::IpApi),
            Some(s) => ProviderId::try_from(s),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Set/replace a provider API key and set the default provider if none is set.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.entry(provider_id.as_str().to_string()).or_default().api_key =
            Some(api_key);

        if self.default_provider.is_none() {
            self.set_default_provider(provider_id);
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.api_key.as_deref())
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.base_url.as_deref())
    }

    pub fn set_fixed_location(&mut self, location: Location) {
        self.fixed_location = Some(location);
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(IPAPI_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.providers.entry(ProviderId::IpApi.as_str().to_string()).or_default().api_key =
                Some(key);
        }
        self
    }

    /// Intensity table from `dataset_path`, or the built-in one.
    pub fn intensity_table(&self) -> Result<IntensityTable> {
        match &self.dataset_path {
            Some(path) => IntensityTable::from_path(path),
            None => Ok(IntensityTable::builtin()),
        }
    }

    /// Load config from disk with environment overrides applied.
    pub fn load() -> Result<Self> {
        let cfg = Self::load_from(&Self::config_file_path()?)?;
        Ok(cfg.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "co2-estimate", "co2")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
