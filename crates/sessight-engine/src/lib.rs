// Analytics engine - pure functions over rows read from the index.
// Nothing here touches the database or the filesystem; the runtime loads
// the inputs and persists the outputs.

pub mod breakdown;
pub mod classify;
pub mod correlation;
pub mod failures;
pub mod overlap;
pub mod permissions;
pub mod sampling;
pub mod sequence;
pub mod trend;

pub use breakdown::{
    AgentBreakdown, AgentSummary, AgentUsage, Journey, JourneyStep, McpServerUsage, ToolCount,
    collapse_worktree, mcp_servers, merge_file_activity, project_name, summarize_agents,
    trace_journey,
};
pub use classify::{
    ActivityStats, Category, CategoryDistribution, Classification, ClassificationFactors,
    DEFAULT_MIN_EVENTS, SessionClassification, classify, classify_session,
};
pub use correlation::{Attribution, DEFAULT_BUFFER_MINUTES, attribute_commits};
pub use failures::{
    DEFAULT_REWORK_WINDOW_MINUTES, ErrorParam, FailedCall, FailureSummary, ReworkInstance,
    ToolErrors, ToolFailures, detect_rework, group_error_details, summarize_failures,
};
pub use overlap::{OverlapPeriod, OverlapSession, detect_overlaps};
pub use permissions::{DEFAULT_PERMISSION_THRESHOLD, PermissionGap, find_permission_gaps};
pub use sampling::{
    ContextStep, MAX_PATTERN_CHARS, Occurrence, PatternError, find_occurrences,
    parse_sequence_pattern, sample_occurrences,
};
pub use sequence::{SEQUENCE_SEPARATOR, SequenceCount, mine_sequences, sequence_key};
pub use trend::{
    CompareMode, Direction, MetricChange, PeriodComparison, ToolChange, TrendMetrics, compare_periods,
};

#[cfg(test)]
mod testutil {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use sessight_types::{SessionSpan, ToolStep};

    /// `minute` minutes after 2025-01-15 10:00.
    pub fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    pub fn step(session: &str, minute: i64, tool: &str) -> ToolStep {
        ToolStep {
            session_id: session.to_string(),
            project_path: "proj".to_string(),
            timestamp: at(minute),
            tool_name: tool.to_string(),
            file_path: None,
            command: None,
        }
    }

    pub fn span(session: &str, start: i64, end: i64, events: i64) -> SessionSpan {
        SessionSpan {
            session_id: session.to_string(),
            project_path: format!("proj-{}", session),
            start: at(start),
            end: at(end),
            event_count: events,
        }
    }
}
