//! Application configuration management.
//!
//! Holds the backend URL and the persisted user preferences that seed
//! `AppSettings` at startup.
//!
//! Configuration is stored at `~/.config/kozalma/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::messages::Language;
use crate::settings::AppSettings;

/// Application name used for config directory paths
const APP_NAME: &str = "kozalma";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `api_base_url` when set
pub const API_URL_ENV: &str = "KOZALMA_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub language: Language,
    pub tts_speed: f32,
    pub volume: f32,
    pub send_unknown: bool,
    pub double_tap_window_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let settings = AppSettings::default();
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            language: settings.language,
            tts_speed: settings.tts_speed,
            volume: settings.volume,
            send_unknown: settings.send_unknown,
            double_tap_window_ms: 400,
        }
    }
}

impl Config {
    /// Load from the default location, then apply `KOZALMA_API_URL`.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().to_string();
            }
        }
        Ok(config)
    }

    /// Missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Initial settings for the `SettingsStore`
    pub fn settings(&self) -> AppSettings {
        AppSettings {
            language: self.language,
            tts_speed: self.tts_speed,
            volume: self.volume.clamp(0.0, 1.0),
            send_unknown: self.send_unknown,
            flashlight: false,
        }
    }

    /// Keep the persisted preferences in step with the live settings
    pub fn apply_settings(&mut self, settings: &AppSettings) {
        self.language = settings.language;
        self.tts_speed = settings.tts_speed;
        self.volume = settings.volume;
        self.send_unknown = settings.send_unknown;
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("kozalma-test-{}-{}", std::process::id(), name))
            .join(CONFIG_FILE)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(&temp_path("missing")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.double_tap_window(), Duration::from_millis(400));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut config = Config::default();
        config.language = Language::Kz;
        config.tts_speed = 1.25;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"language":"kz"}"#).unwrap();
        assert_eq!(config.language, Language::Kz);
        assert_eq!(config.volume, 0.8);
        assert_eq!(config.double_tap_window_ms, 400);
    }

    #[test]
    fn test_settings_clamps_volume() {
        let config = Config {
            volume: 3.0,
            send_unknown: true,
            ..Default::default()
        };
        let settings = config.settings();
        assert_eq!(settings.volume, 1.0);
        assert!(settings.send_unknown);
        assert!(!settings.flashlight);
    }

    #[test]
    fn test_apply_settings() {
        let mut config = Config::default();
        config.apply_settings(&AppSettings {
            volume: 0.3,
            language: Language::Kz,
            ..Default::default()
        });
        assert_eq!(config.volume, 0.3);
        assert_eq!(config.language, Language::Kz);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = temp_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
