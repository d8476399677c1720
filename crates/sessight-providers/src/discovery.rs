use chrono::{Duration, NaiveDateTime};
use sessight_types::utc_now;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::time::system_time_to_utc;

/// Default root of Claude Code session logs (`~/.claude/projects`).
pub fn default_logs_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("projects"))
}

/// A session log found under the logs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    /// Encoded project directory name
    pub project: String,
    pub modified: NaiveDateTime,
    pub size: u64,
}

/// Find `<root>/<project>/*.jsonl` files modified in the last `days` days,
/// newest first.
///
/// `project` keeps only directories whose name contains it (case-sensitive).
/// A missing root yields nothing.
pub fn discover_log_files(root: &Path, days: u32, project: Option<&str>) -> Vec<LogFile> {
    if !root.is_dir() {
        return Vec::new();
    }

    let cutoff = utc_now() - Duration::days(i64::from(days));
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(2).max_depth(2) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable log entry");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "jsonl") {
            continue;
        }

        let Some(project_dir) = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
        else {
            continue;
        };
        if let Some(filter) = project
            && !project_dir.contains(filter)
        {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "cannot stat log file");
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(time) => system_time_to_utc(time),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "no modification time");
                continue;
            }
        };
        if modified < cutoff {
            continue;
        }

        files.push(LogFile {
            path: path.to_path_buf(),
            project: project_dir,
            modified,
            size: metadata.len(),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    files
}
