//! Isolated environment for end-to-end tests.
//!
//! A `TestWorld` owns a temporary directory holding a Claude-style log root
//! (`projects/<encoded-dir>/<session>.jsonl`), a data directory for the
//! database and a settings file for the permission allow-list.

use anyhow::{Context, Result};
use filetime::{FileTime, set_file_mtime};
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::fixtures::SessionLog;

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use sessight_testing::{SessionLog, TestWorld};
///
/// let world = TestWorld::new();
/// let log = SessionLog::new("s1").user(0, "hello").read(1, "/work/app/README.md");
/// world.write_log("-work-app", &log).unwrap();
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    logs_dir: PathBuf,
    data_dir: PathBuf,
    settings_path: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let logs_dir = base.join(".claude").join("projects");
        let data_dir = base.join(".sessight");

        fs::create_dir_all(&logs_dir).expect("Failed to create log dir");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self {
            settings_path: base.join(".claude").join("settings.json"),
            temp_dir,
            logs_dir,
            data_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root scanned for session logs.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Database location inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("data.db")
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Write `log` to `<project>/<session_id>.jsonl`, replacing any previous
    /// content.
    pub fn write_log(&self, project: &str, log: &SessionLog) -> Result<PathBuf> {
        let dir = self.logs_dir.join(project);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create project dir {}", dir.display()))?;

        let path = dir.join(format!("{}.jsonl", log.session_id()));
        fs::write(&path, log.to_jsonl())
            .with_context(|| format!("Failed to write log {}", path.display()))?;
        Ok(path)
    }

    /// Append raw lines to an existing log.
    pub fn append_lines(&self, path: &Path, lines: &[&str]) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log {}", path.display()))?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Set a file's modification time to `age` in the past.
    pub fn set_age(&self, path: &Path, age: Duration) -> Result<()> {
        let mtime = SystemTime::now()
            .checked_sub(age)
            .context("Age is before the epoch")?;
        set_file_mtime(path, FileTime::from_system_time(mtime))
            .with_context(|| format!("Failed to set mtime of {}", path.display()))?;
        Ok(())
    }

    /// Write an allow-list with the given entries, e.g. `Bash(git:*)`.
    pub fn write_settings(&self, allow: &[&str]) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let settings = json!({ "permissions": { "allow": allow } });
        fs::write(&self.settings_path, serde_json::to_string_pretty(&settings)?)
            .context("Failed to write settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_log_uses_session_file_name() {
        let world = TestWorld::new();
        let log = SessionLog::new("abc").user(0, "hi");
        let path = world.write_log("-work-app", &log).unwrap();

        assert_eq!(path, world.logs_dir().join("-work-app").join("abc.jsonl"));
        assert_eq!(fs::read_to_string(&path).unwrap(), log.to_jsonl());
    }

    #[test]
    fn test_set_age_moves_mtime_back() {
        let world = TestWorld::new();
        let path = world
            .write_log("-p", &SessionLog::new("s").user(0, "x"))
            .unwrap();
        world
            .set_age(&path, Duration::from_secs(3 * 86_400))
            .unwrap();

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        let age = SystemTime::now().duration_since(modified).unwrap();
        assert!(age >= Duration::from_secs(3 * 86_400 - 5));
    }
}
