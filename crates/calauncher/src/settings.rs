use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use calauncher_core::{min_timestamp, parse_timestamp};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LauncherSettings {
    #[serde(default)]
    pub selected_version: Option<String>,

    #[serde(default, deserialize_with = "lenient_check_time")]
    pub last_update_check: Option<DateTime<Utc>>,

    #[serde(default)]
    pub include_test_releases: bool,
}

/// Accepts zone-less timestamps as UTC. The minimum date and anything
/// unparseable mean "never checked".
fn lenient_check_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(parse_timestamp)
        .filter(|at| *at > min_timestamp()))
}

/// Launcher settings backed by `settings.json`.
///
/// Every setter persists immediately. Read errors fall back to defaults and
/// write errors are logged, so settings never block an operation.
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: LauncherSettings,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = load(&path);
        Self {
            path: Some(path),
            settings,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn selected_version(&self) -> Option<&str> {
        self.settings.selected_version.as_deref()
    }

    pub fn last_update_check(&self) -> Option<DateTime<Utc>> {
        self.settings.last_update_check
    }

    pub fn include_test_releases(&self) -> bool {
        self.settings.include_test_releases
    }

    pub fn set_selected_version(&mut self, version: Option<String>) {
        if self.settings.selected_version != version {
            self.settings.selected_version = version;
            self.save();
        }
    }

    pub fn set_last_update_check(&mut self, at: DateTime<Utc>) {
        self.settings.last_update_check = Some(at);
        self.save();
    }

    pub fn set_include_test_releases(&mut self, include: bool) {
        if self.settings.include_test_releases != include {
            self.settings.include_test_releases = include;
            self.save();
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let content = match serde_json::to_vec_pretty(&self.settings) {
            Ok(content) => content,
            Err(error) => {
                warn!("Failed to serialize settings: {error}");
                return;
            }
        };
        match calauncher_platform::write_atomic(path, &content) {
            Ok(()) => debug!("Saved settings to {}", path.display()),
            Err(error) => warn!("Failed to save settings to {}: {error}", path.display()),
        }
    }
}

fn load(path: &Path) -> LauncherSettings {
    if !path.exists() {
        return LauncherSettings::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
            warn!("Resetting unreadable settings {}: {error}", path.display());
            LauncherSettings::default()
        }),
        Err(error) => {
            warn!("Failed to read settings {}: {error}", path.display());
            LauncherSettings::default()
        }
    }
}
