use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::{models::Goal, tracking::TrackingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKind {
    Json,
    Sqlite,
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Json
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub default_goal: u32,
    pub storage: StorageKind,
    pub tick_interval_ms: u64,
    pub tracking: TrackingConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_goal: Goal::DEFAULT.get(),
            storage: StorageKind::Json,
            tick_interval_ms: 1000,
            tracking: TrackingConfig::default(),
        }
    }
}

impl AppSettings {
    /// Falls back to [`Goal::DEFAULT`] when the stored value is zero.
    pub fn default_goal(&self) -> Goal {
        Goal::new(self.default_goal).unwrap_or_else(|_| {
            warn!("Stored default goal is zero, using {}", Goal::DEFAULT.get());
            Goal::DEFAULT
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn history_path(&self, data_dir: &Path) -> PathBuf {
        match self.storage {
            StorageKind::Json => data_dir.join("history.json"),
            StorageKind::Sqlite => data_dir.join("repcount.sqlite3"),
        }
    }
}

/// Resolves the data directory: `REPCOUNT_DATA_DIR`, else `~/.repcount`,
/// else `.repcount` in the working directory.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REPCOUNT_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".repcount")
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing or malformed file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn set_default_goal(&self, goal: Goal) -> Result<()> {
        let mut guard = self.write();
        guard.default_goal = goal.get();
        self.persist(&guard)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
