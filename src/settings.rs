//! Client settings with serialization support

use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Version poll intervals offered in the settings popup, in seconds
pub const POLL_PRESETS: [u64; 4] = [5, 10, 30, 60];

const DEFAULT_POLL_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to create config directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write settings file: {0}")]
    Write(#[source] std::io::Error),
}

/// `30s`, `1m`, `90s`
pub fn interval_label(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Where the dashboard finds its backend and how it polls it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Backend base URL, without trailing slash
    pub server_url: String,

    /// Panels shown, each with its own poller
    pub resources: Vec<Resource>,

    pub version_poll_secs: u64,

    /// How far the evening palette is blended in at night (0..=1)
    pub evening_intensity: f64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            resources: Resource::ALL.to_vec(),
            version_poll_secs: DEFAULT_POLL_SECS,
            evening_intensity: crate::theme::DEFAULT_EVENING_INTENSITY,
        }
    }
}

impl ClientSettings {
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("home-infocenter").join("settings.json"))
    }

    /// Load settings from file or return defaults
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&contents) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SettingsError::CreateDir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(SettingsError::Write)?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Normalize values coming from disk or the settings popup
    pub fn sanitized(mut self) -> Self {
        self.server_url = self.server_url.trim().trim_end_matches('/').to_string();
        self.evening_intensity = self.evening_intensity.clamp(0.0, 1.0);
        if self.version_poll_secs == 0 {
            self.version_poll_secs = DEFAULT_POLL_SECS;
        }
        self.resources.sort();
        self.resources.dedup();
        self
    }

    pub fn config_url(&self) -> String {
        format!("{}/api/config", self.server_url)
    }

    pub fn data_url(&self, resource: Resource) -> String {
        format!("{}{}", self.server_url, resource.data_path())
    }

    pub fn version_url(&self, resource: Resource) -> String {
        format!("{}{}", self.server_url, resource.version_path())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.version_poll_secs)
    }

    pub fn poll_label(&self) -> String {
        interval_label(self.version_poll_secs)
    }

    pub fn is_enabled(&self, resource: Resource) -> bool {
        self.resources.contains(&resource)
    }

    pub fn set_enabled(&mut self, resource: Resource, enabled: bool) {
        if enabled && !self.is_enabled(resource) {
            self.resources.push(resource);
            self.resources.sort();
        } else if !enabled {
            self.resources.retain(|r| *r != resource);
        }
    }
}
