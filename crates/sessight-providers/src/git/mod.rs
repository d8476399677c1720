//! Commit history of a repository.

mod cli;
mod log;

pub use cli::GitCli;
pub use log::{LOG_FORMAT, ParsedLog, parse_git_log};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Failure to obtain commit history.
#[derive(Debug)]
pub enum GitError {
    NotARepository(PathBuf),
    /// The binary could not be started
    Spawn(std::io::Error),
    Timeout(Duration),
    Exit { code: Option<i32>, stderr: String },
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::NotARepository(path) => {
                write!(f, "not a git repository: {}", path.display())
            }
            GitError::Spawn(err) => write!(f, "failed to run git: {}", err),
            GitError::Timeout(limit) => {
                write!(f, "git log timed out after {}s", limit.as_secs())
            }
            GitError::Exit { code, stderr } => match code {
                Some(code) => write!(f, "git exited with status {}: {}", code, stderr.trim()),
                None => write!(f, "git terminated by signal: {}", stderr.trim()),
            },
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// Source of raw `git log` output in [`LOG_FORMAT`].
pub trait CommitSource {
    fn log(&self, repo: &Path, days: u32) -> Result<String, GitError>;
}
