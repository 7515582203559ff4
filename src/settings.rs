//! Persisted configuration.
//!
//! One small TOML file holds the touch calibration decision and the user
//! input preferences. Loading is lenient: a missing or unparsable file just
//! yields defaults, with a warning in the latter case.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SETTINGS_PATH: &str = "/mnt/onboard/.ntx-hal/settings.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Persisted axis-swap calibration decision for panels that need the
    /// interactive probe. Absent until calibration has run once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touch_switch_xy: Option<bool>,

    /// User preference: drop gravity-sensor input entirely.
    #[serde(default)]
    pub ignore_accelerometer: bool,

    /// Global override inverting the descriptor's axis-swap decision.
    #[serde(default)]
    pub invert_touch_axes: bool,
}

/// A settings file bound to its on-disk location.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    pub values: Settings,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load_from_path(&path).unwrap_or_default();
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, content)?;
        log::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

fn load_from_path(path: &Path) -> Option<Settings> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(settings) => {
            log::debug!("Loaded settings from {}", path.display());
            Some(settings)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ntx-hal-settings-{}-{}.toml",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::open(temp_path("missing"));
        assert_eq!(store.values.touch_switch_xy, None);
        assert!(!store.values.ignore_accelerometer);
    }

    #[test]
    fn round_trip() {
        let path = temp_path("roundtrip");
        let mut store = SettingsStore::open(&path);
        store.values.touch_switch_xy = Some(true);
        store.values.ignore_accelerometer = true;
        store.save().unwrap();

        let reread = SettingsStore::open(&path);
        assert_eq!(reread.values.touch_switch_xy, Some(true));
        assert!(reread.values.ignore_accelerometer);
        assert!(!reread.values.invert_touch_axes);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn garbage_file_warns_and_defaults() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not = [valid").unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.values.touch_switch_xy, None);
        let _ = std::fs::remove_file(&path);
    }
}
