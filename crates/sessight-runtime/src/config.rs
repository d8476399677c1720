use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SESSIGHT_PATH";

/// Resolve the data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. SESSIGHT_PATH environment variable (with tilde expansion)
/// 3. XDG data directory
/// 4. ~/.sessight
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var(DATA_DIR_ENV) {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("sessight"));
    }

    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".sessight"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub binary: PathBuf,
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
            timeout_secs: 30,
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Defaults for the analytics operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lookback window in days
    pub days: u32,
    pub sequence_length: usize,
    pub min_sequence_count: i64,
    pub permission_threshold: i64,
    pub min_session_events: i64,
    /// Age of the last ingestion after which data is refreshed
    pub freshness_minutes: i64,
    /// Slack around session spans when attributing commits
    pub commit_buffer_minutes: i64,
    pub rework_window_minutes: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            days: 7,
            sequence_length: 2,
            min_sequence_count: 3,
            permission_threshold: sessight_engine::DEFAULT_PERMISSION_THRESHOLD,
            min_session_events: sessight_engine::DEFAULT_MIN_EVENTS,
            freshness_minutes: 5,
            commit_buffer_minutes: sessight_engine::DEFAULT_BUFFER_MINUTES,
            rework_window_minutes: sessight_engine::DEFAULT_REWORK_WINDOW_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of session logs; `~/.claude/projects` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,
    /// Permission allow-list; `~/.claude/settings.json` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    /// Database file; `<data dir>/data.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_data_dir(None)?.join("config.toml"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf> {
        match &self.logs_dir {
            Some(dir) => Ok(dir.clone()),
            None => sessight_providers::default_logs_dir()
                .ok_or_else(|| Error::Config("Could not determine the session logs root".into())),
        }
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_path
            .clone()
            .or_else(sessight_providers::default_settings_path)
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| data_dir.join("data.db"))
    }
}
