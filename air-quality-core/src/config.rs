use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{
    category::CategoryMapping,
    request::{LocalAqi, Location},
};

/// Custom local AQI as stored on disk, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAqiConfig {
    pub region_code: String,
    pub custom_local_aqi: String,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// referrer = "https://example.com"
///
/// [location]
/// latitude = 52.52
/// longitude = 13.405
///
/// [local_aqi]
/// region_code = "DE"
/// custom_local_aqi = "deu_uba"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,

    /// Sent as `Referer` for keys restricted to HTTP referrers.
    pub referrer: Option<String>,

    /// Used when a command is run without coordinates.
    pub location: Option<Location>,

    pub local_aqi: Option<LocalAqiConfig>,

    /// Replacement category dataset; the bundled one is used when unset.
    pub category_table: Option<PathBuf>,
}

impl Config {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `air-quality configure` and enter your Google Maps Platform API key."
            )
        })
    }

    pub fn require_location(&self) -> Result<Location> {
        self.location.ok_or_else(|| {
            anyhow!(
                "No location given and no default location configured.\n\
                 Hint: pass --lat/--lon or run `air-quality configure`."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Bundled category table, or the one at `category_table`.
    pub fn category_mapping(&self) -> Result<CategoryMapping> {
        match &self.category_table {
            Some(path) => CategoryMapping::from_file(path)
                .with_context(|| format!("Failed to load category table: {}", path.display())),
            None => CategoryMapping::builtin().context("Bundled category table is invalid"),
        }
    }

    /// Validate the stored local AQI against `mapping`.
    pub fn local_aqi(&self, mapping: &CategoryMapping) -> Result<Option<LocalAqi>> {
        let Some(stored) = &self.local_aqi else {
            return Ok(None);
        };

        let local = LocalAqi::new(&stored.region_code, &stored.custom_local_aqi, mapping)
            .context("Configured local AQI is invalid")?;
        Ok(Some(local))
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "air-quality", "air-quality-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
