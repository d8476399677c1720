//! Error totals and rework detection.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sessight_types::{ErrorDetail, FileEdit, UsageCount};
use std::collections::BTreeMap;

/// Default maximum gap between consecutive edits of one rework run
pub const DEFAULT_REWORK_WINDOW_MINUTES: i64 = 10;
/// Edits of one file needed before a run counts as rework
const MIN_REWORK_EDITS: usize = 3;
const MAX_TOOLS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolErrors {
    pub tool: String,
    pub errors: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub total_errors: i64,
    pub sessions_with_errors: usize,
    /// Two decimals
    pub avg_errors_per_session: f64,
    pub errors_by_tool: Vec<ToolErrors>,
}

/// Roll per-session and per-tool error counts into a summary.
///
/// `by_tool` is expected most frequent first; only the first ten are kept.
pub fn summarize_failures(by_session: &[UsageCount], by_tool: &[UsageCount]) -> FailureSummary {
    let total_errors: i64 = by_session.iter().map(|s| s.count).sum();
    let sessions_with_errors = by_session.iter().filter(|s| s.count > 0).count();
    let avg = if sessions_with_errors == 0 {
        0.0
    } else {
        total_errors as f64 / sessions_with_errors as f64
    };

    FailureSummary {
        total_errors,
        sessions_with_errors,
        avg_errors_per_session: (avg * 100.0).round() / 100.0,
        errors_by_tool: by_tool
            .iter()
            .take(MAX_TOOLS)
            .map(|t| ToolErrors {
                tool: t.key.clone(),
                errors: t.count,
            })
            .collect(),
    }
}

/// A burst of edits to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReworkInstance {
    pub session_id: String,
    pub file: String,
    pub edit_count: usize,
    pub first_edit: NaiveDateTime,
    pub last_edit: NaiveDateTime,
    /// Whole minutes between first and last edit
    pub duration_minutes: i64,
}

/// Find runs of three or more edits to the same file in one session where
/// each edit follows the previous within `window`.
///
/// `edits` must be ordered by session, file, then time.
pub fn detect_rework(edits: &[FileEdit], window: Duration) -> Vec<ReworkInstance> {
    let mut found = Vec::new();

    for file_edits in
        edits.chunk_by(|a, b| a.session_id == b.session_id && a.file_path == b.file_path)
    {
        for run in file_edits.chunk_by(|a, b| b.timestamp - a.timestamp <= window) {
            if run.len() < MIN_REWORK_EDITS {
                continue;
            }
            let (first, last) = (&run[0], &run[run.len() - 1]);
            found.push(ReworkInstance {
                session_id: first.session_id.clone(),
                file: first.file_path.clone(),
                edit_count: run.len(),
                first_edit: first.timestamp,
                last_edit: last.timestamp,
                duration_minutes: (last.timestamp - first.timestamp).num_minutes(),
            });
        }
    }

    found
}

/// Argument of a failed call that identifies what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorParam {
    Pattern,
    Command,
    FilePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCall {
    pub param_type: ErrorParam,
    pub param_value: Option<String>,
    pub error_count: i64,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_path: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ToolFailures {
    pub total: i64,
    pub calls: Vec<FailedCall>,
}

/// Group error details by tool, keeping at most `limit` calls per tool.
///
/// Glob and Grep are keyed by their pattern, Bash by its program and every
/// other tool by its file. Totals count all calls, including dropped ones.
pub fn group_error_details(
    details: &[ErrorDetail],
    limit: usize,
) -> BTreeMap<String, ToolFailures> {
    let mut grouped: BTreeMap<String, ToolFailures> = BTreeMap::new();

    for detail in details {
        let is_search = matches!(detail.tool_name.as_str(), "Glob" | "Grep");
        let (param_type, param_value) = match detail.tool_name.as_str() {
            "Glob" | "Grep" => (ErrorParam::Pattern, detail.pattern.clone()),
            "Bash" => (ErrorParam::Command, detail.command.clone()),
            _ => (ErrorParam::FilePath, detail.file_path.clone()),
        };

        let tool = grouped.entry(detail.tool_name.clone()).or_default();
        tool.total += detail.error_count;
        if tool.calls.len() < limit {
            tool.calls.push(FailedCall {
                param_type,
                param_value,
                error_count: detail.error_count,
                project: detail.project_path.clone(),
                search_path: detail.search_path.clone().filter(|_| is_search),
            });
        }
    }

    grouped
}
