//! YAML settings file

use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::infrastructure::consumers::change_log::{
    is_usable_log_date_format, DEFAULT_LOG_DATE_FORMAT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::debug;

/// User settings for the built-in providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider id → program to run instead of the provider's default
    pub executables: BTreeMap<String, String>,

    /// chrono format git is asked to print change log dates in; svn dates have a fixed format
    pub changelog_date_format: String,

    /// Variables added to every tool invocation unless it sets them itself
    pub environment: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executables: BTreeMap::new(),
            changelog_date_format: DEFAULT_LOG_DATE_FORMAT.to_string(),
            environment: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Program configured for `provider_id`, if any
    pub fn executable(&self, provider_id: &str) -> Option<&str> {
        self.executables.get(provider_id).map(String::as_str)
    }
}

/// Reads [`Settings`] from YAML files
#[derive(Debug, Clone, Default)]
pub struct SettingsStore;

impl SettingsStore {
    /// Create a new settings store
    pub fn new() -> Self {
        Self
    }

    /// Parse settings from YAML text
    pub fn parse(&self, content: &str) -> UniscmResult<Settings> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings = serde_yaml::from_str(content).map_err(|e| {
            ScmError::config_error_with_source("Invalid settings file", None, e)
        })?;
        Self::checked(settings, None)
    }

    /// Load settings from `path`, which must exist
    pub async fn load(&self, path: impl AsRef<Path>) -> UniscmResult<Settings> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ScmError::config_error(
                "Settings file not found",
                Some(path.to_path_buf()),
            ));
        }

        let content = async_fs::read_to_string(path).await.map_err(|e| {
            ScmError::filesystem_error_with_source(
                "Failed to read settings file",
                Some(path.to_path_buf()),
                e,
            )
        })?;

        let settings = serde_yaml::from_str::<Settings>(&content).map_err(|e| {
            ScmError::config_error_with_source(
                "Invalid settings file",
                Some(path.to_path_buf()),
                e,
            )
        })?;
        let settings = Self::checked(settings, Some(path.to_path_buf()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn checked(settings: Settings, path: Option<PathBuf>) -> UniscmResult<Settings> {
        if !is_usable_log_date_format(&settings.changelog_date_format) {
            return Err(ScmError::config_error(
                format!(
                    "changelog_date_format '{}' cannot be read back as a timestamp",
                    settings.changelog_date_format
                ),
                path,
            ));
        }
        Ok(settings)
    }

    /// Load settings from `path` when given, otherwise use the defaults
    pub async fn load_or_default(&self, path: Option<&PathBuf>) -> UniscmResult<Settings> {
        match path {
            Some(path) => self.load(path).await,
            None => Ok(Settings::default()),
        }
    }

    /// Render settings as YAML
    pub fn to_yaml(&self, settings: &Settings) -> UniscmResult<String> {
        serde_yaml::to_string(settings).map_err(|e| {
            ScmError::serialization_error_with_source("Failed to serialize settings", e)
        })
    }
}
