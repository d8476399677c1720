//! Plain aggregate rows read from the store and consumed by the analytics
//! engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A grouped count with the most recent occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCount {
    pub key: String,
    pub count: i64,
    pub last_seen: Option<NaiveDateTime>,
}

/// One tool invocation in session order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStep {
    pub session_id: String,
    pub project_path: String,
    pub timestamp: NaiveDateTime,
    pub tool_name: String,
    pub file_path: Option<String>,
    pub command: Option<String>,
}

/// Observed time span of a session inside a query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpan {
    pub session_id: String,
    pub project_path: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub event_count: i64,
}

/// Per-session activity counters used for classification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionActivity {
    pub session_id: String,
    pub project_path: String,
    pub total_events: i64,
    pub edit_count: i64,
    pub read_count: i64,
    pub write_count: i64,
    /// Grep, Glob and WebSearch
    pub search_count: i64,
    /// Shell invocations of git or gh
    pub git_count: i64,
    /// Shell invocations of make, cargo, npm or pytest
    pub build_count: i64,
    pub error_count: i64,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

/// Totals for one period of trend analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub events: i64,
    pub sessions: i64,
    pub errors: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub tool_counts: BTreeMap<String, i64>,
}

impl PeriodMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            self.errors as f64 / self.events as f64
        }
    }
}

/// An Edit of a file, used for rework detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub session_id: String,
    pub file_path: String,
    pub timestamp: NaiveDateTime,
}

/// Reads, edits and writes of one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileActivity {
    pub file_path: String,
    pub reads: i64,
    pub edits: i64,
    pub writes: i64,
    pub total: i64,
}

/// Events and sessions of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectActivity {
    pub project_path: String,
    pub events: i64,
    pub sessions: i64,
}

/// Activity of one sub-agent, or of the main conversation when `agent_id`
/// is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub agent_id: Option<String>,
    pub event_count: i64,
    pub tool_use_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub sidechain_events: i64,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentToolCount {
    pub agent_id: String,
    pub tool_name: String,
    pub count: i64,
}

/// Failed tool results grouped by the arguments of the call that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub tool_name: String,
    pub command: Option<String>,
    pub file_path: Option<String>,
    /// `pattern` argument of Glob and Grep
    pub pattern: Option<String>,
    /// `path` argument of Glob and Grep
    pub search_path: Option<String>,
    pub project_path: String,
    pub error_count: i64,
}

/// Another session connected to a given one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedSession {
    pub session_id: String,
    pub project_path: String,
    /// Shared files or commands, or the event count for temporal neighbours
    pub shared: i64,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
}
