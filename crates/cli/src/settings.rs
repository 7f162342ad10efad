use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Optional settings file. Every field may be omitted; command-line flags
/// take precedence over anything set here.
///
/// ```json
/// {"threshold": 70.0, "window": 7, "label_map": "/etc/door/label_map.json"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub threshold: Option<f64>,
    pub comparison: Option<String>,
    pub window: Option<usize>,
    pub tie_break: Option<String>,
    pub hold_secs: Option<f64>,
    pub alert_cooldown_secs: Option<f64>,
    pub animation_steps: Option<u32>,
    pub label_map: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
    pub intruders_dir: Option<PathBuf>,
    pub fps: Option<f64>,
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("door-access").join("settings.json"))
    }

    /// Loads `explicit` if given, failing if it is missing or invalid.
    /// Otherwise reads the per-user settings file when one exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read settings file {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings file {}: {e}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
