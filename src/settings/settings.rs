// Settings loading
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;

/// Render loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub tick_interval_ms: u64, // 20 ms = 50 redraws per second
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
        }
    }
}

/// Shutdown settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownSettings {
    /// How long close waits for the playback worker to exit
    pub grace_period_ms: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 100,
        }
    }
}

/// Output device settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub device: Option<String>, // None = default output device
    pub null_output: bool,      // Silent clocked output, no hardware
}

/// File browsing settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseSettings {
    pub directory: Option<PathBuf>,
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version
    pub render: RenderSettings,
    pub shutdown: ShutdownSettings,
    pub output: OutputSettings,
    pub browse: BrowseSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            render: RenderSettings::default(),
            shutdown: ShutdownSettings::default(),
            output: OutputSettings::default(),
            browse: BrowseSettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file, or return defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::info!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: AppSettings = serde_json::from_str(&content)?;

        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.render.tick_interval_ms.max(1))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown.grace_period_ms)
    }

    /// Starting folder for the file dialog
    pub fn browse_directory(&self) -> PathBuf {
        self.browse
            .directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::load(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.tick_interval(), Duration::from_millis(20));
        assert_eq!(settings.grace_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "render": { "tick_interval_ms": 40 }, "output": { "null_output": true } }"#)
            .unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.render.tick_interval_ms, 40);
        assert!(settings.output.null_output);
        assert_eq!(settings.output.device, None);
        assert_eq!(settings.shutdown, ShutdownSettings::default());
        assert_eq!(settings.version, 1);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(AppSettings::load(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_zero_tick_interval_is_clamped() {
        let mut settings = AppSettings::default();
        settings.render.tick_interval_ms = 0;
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_browse_directory_defaults_to_cwd() {
        let settings = AppSettings::default();
        assert_eq!(settings.browse_directory(), std::env::current_dir().unwrap());

        let mut settings = AppSettings::default();
        settings.browse.directory = Some(PathBuf::from("/srv/audio"));
        assert_eq!(settings.browse_directory(), PathBuf::from("/srv/audio"));
    }
}
