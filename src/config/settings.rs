//! Launcher settings and their on-disk store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where the helper scripts live and how to run them.
///
/// Captured once per action and handed to the job builders; nothing reads
/// settings through globals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Interpreter that runs the helper scripts.
    pub python: String,
    /// Directory the installer wrote the helper scripts into.
    pub scripts_dir: PathBuf,
    /// Directory the scripts run in. They look up `OpenVoice/checkpoints_v2`
    /// relative to it. Defaults to `scripts_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            scripts_dir: PathBuf::from("."),
            workdir: None,
        }
    }
}

impl LauncherConfig {
    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }

    pub fn working_dir(&self) -> &Path {
        self.workdir.as_deref().unwrap_or(&self.scripts_dir)
    }

    /// Expand `~` and make both directories absolute, so script paths stay
    /// valid whatever directory the child starts in.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        self.scripts_dir = std::path::absolute(expand_home(&self.scripts_dir)?)?;
        if let Some(dir) = self.workdir.take() {
            self.workdir = Some(std::path::absolute(expand_home(&dir)?)?);
        }
        Ok(self)
    }
}

/// Expand a leading `~` component to the home directory.
pub fn expand_home(path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Reads and writes [`LauncherConfig`] as JSON.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at the default location under the home directory.
    pub fn new() -> Result<Self, ConfigError> {
        let path = dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".openvoice-launcher")
            .join("config.json");

        Ok(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LauncherConfig, ConfigError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(LauncherConfig::default());
        }

        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, config: &LauncherConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;

        Ok(())
    }
}
