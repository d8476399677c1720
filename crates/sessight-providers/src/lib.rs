// Error types
pub mod error;

// Claude Code log format
pub mod claude;

// Log file discovery
pub mod discovery;

// Commit history source
pub mod git;

// Permission allow-list
pub mod settings;

// Timestamp normalization
mod time;

pub use claude::{ParsedFile, parse_line, parse_record, project_name, read_log_file};
pub use discovery::{LogFile, default_logs_dir, discover_log_files};
pub use error::{Error, Result};
pub use git::{CommitSource, GitCli, GitError, ParsedLog, parse_git_log};
pub use settings::{default_settings_path, load_allowed_commands};
pub use time::{parse_timestamp, system_time_to_utc};
