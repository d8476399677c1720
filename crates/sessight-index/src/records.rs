use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sessight_types::TimeWindow;

/// Filter for range queries over events.
///
/// `project` is a substring match against the project path.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub window: Option<TimeWindow>,
    pub tool_name: Option<String>,
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn in_window(window: TimeWindow) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    pub fn tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Store-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbStats {
    pub event_count: i64,
    pub session_count: i64,
    pub pattern_count: i64,
    pub files_processed: i64,
    pub git_commit_count: i64,
    pub earliest_event: Option<NaiveDateTime>,
    pub latest_event: Option<NaiveDateTime>,
    pub db_size_bytes: u64,
    /// `None` for in-memory stores
    pub db_path: Option<String>,
    pub schema_version: i32,
}

/// A session's linked commit together with the commit's details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCommitDetail {
    pub sha: String,
    pub timestamp: Option<NaiveDateTime>,
    pub author: Option<String>,
    pub message: Option<String>,
    pub time_to_commit_seconds: i64,
    pub is_first_commit: bool,
}

/// What makes another session related to a given one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedBy {
    /// Touched the same files
    Files,
    /// Ran the same shell programs
    Commands,
    /// Active within an hour of it
    Temporal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenGrouping {
    Day,
    Session,
    Model,
}

/// Token totals for one group of [`TokenGrouping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageRow {
    pub key: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cache_creation_tokens: i64,
    pub event_count: i64,
}
