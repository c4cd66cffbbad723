// Configuration management for persistent updater settings

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::settings::UpdaterSettings;

#[cfg(debug_assertions)]
const APP_NAME: &str = "omo-updater-dev";

#[cfg(not(debug_assertions))]
const APP_NAME: &str = "omo-updater";

/// Manages persistent configuration files
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    const SETTINGS_FILE: &'static str = "updater.json";

    /// Create a new ConfigManager, initializing the config directory if needed
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Self::with_config_dir(config_dir)
    }

    /// Use an explicit directory instead of the platform default.
    pub fn with_config_dir(config_dir: PathBuf) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        }
        Ok(Self { config_dir })
    }

    /// Get the platform-specific config directory
    fn get_config_dir() -> Result<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_NAME)).context("Could not determine config directory")
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.config_dir.join(filename)
    }

    /// Load data from a JSON file
    fn load_json<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);

        if !path.exists() {
            return Ok(None);
        }

        let data =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", filename))?;

        let value: T = serde_json::from_str(&data)
            .with_context(|| format!("Failed to deserialize {}", filename))?;

        Ok(Some(value))
    }

    /// Save data to a JSON file (atomic via temp + rename).
    fn save_json<T: Serialize + ?Sized>(&self, filename: &str, data: &T) -> Result<()> {
        let path = self.file_path(filename);

        let json = serde_json::to_string_pretty(data)
            .with_context(|| format!("Failed to serialize {}", filename))?;

        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write {}", filename))?;

        Ok(())
    }

    /// Load updater settings, falling back to defaults when none are saved
    pub fn load_settings(&self) -> Result<UpdaterSettings> {
        Ok(self.load_json(Self::SETTINGS_FILE)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &UpdaterSettings) -> Result<()> {
        self.save_json(Self::SETTINGS_FILE, settings)
    }
}

/// Write `data` to `path` atomically: write a sibling temp file, then rename over
/// the target so readers see either the old or the new content.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::i18n::Locale;

    #[test]
    fn load_settings_without_file_returns_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp_dir.path().to_path_buf())
            .expect("failed to create manager");

        let settings = manager.load_settings().expect("failed to load settings");
        assert_eq!(settings, UpdaterSettings::default());
    }

    #[test]
    fn save_then_load_settings() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp_dir.path().join("nested"))
            .expect("failed to create manager");

        let settings = UpdaterSettings {
            endpoint: "https://updates.example.com/{{target}}/latest.json".to_string(),
            auto_download: true,
            locale: Locale::En,
            extra_targets: vec!["darwin-legacy".to_string()],
            ..UpdaterSettings::default()
        };
        manager.save_settings(&settings).expect("failed to save settings");

        assert!(temp_dir.path().join("nested").join(ConfigManager::SETTINGS_FILE).exists());
        let loaded = manager.load_settings().expect("failed to load settings");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn corrupt_settings_is_an_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp_dir.path().to_path_buf())
            .expect("failed to create manager");
        fs::write(temp_dir.path().join(ConfigManager::SETTINGS_FILE), "{not json")
            .expect("failed to write settings");

        assert!(manager.load_settings().is_err());
    }
}
