//! Persistent user preferences.

use chrono::{DateTime, Utc};
use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    #[default]
    ICloudUser,
    LocalOnly,
}

/// Unit the user reads weights in. Stored weights carry no unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

/// User settings serialized to a JSON file in the config directory.
///
/// Every field falls back to its default when missing so older files keep
/// loading after new settings are added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    pub id: Uuid,
    pub auth_mode: AuthMode,
    pub weight_unit: WeightUnit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for UserSettings {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            auth_mode: AuthMode::default(),
            weight_unit: WeightUnit::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UserSettings {
    const DIR: &'static str = "minimal_workout_log";
    const FILE: &'static str = "settings.json";

    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::DIR).join(Self::FILE))
    }

    /// Load settings from the JSON configuration file, or defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring unreadable {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory available",
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, data)
    }

    pub fn set_weight_unit(&mut self, unit: WeightUnit) {
        if self.weight_unit != unit {
            self.weight_unit = unit;
            self.updated_at = Utc::now();
        }
    }
}
