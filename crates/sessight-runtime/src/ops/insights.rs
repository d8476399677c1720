use chrono::Duration;
use serde::Serialize;
use sessight_engine::{
    CategoryDistribution, CompareMode, Direction, FailureSummary, OverlapPeriod,
    PeriodComparison, ReworkInstance, SessionClassification, ToolChange, ToolErrors, classify,
    compare_periods, detect_overlaps, detect_rework, summarize_failures,
};
use sessight_index::Database;
use sessight_types::{Pattern, PatternType, TimeWindow};
use std::collections::HashSet;
use tracing::warn;

use crate::Result;
use crate::config::AnalysisConfig;
use crate::ops::patterns::compute_patterns;

const MAX_CLASSIFIED_SESSIONS: usize = 50;
const MAX_REWORK_EXAMPLES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyReport {
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub session_count: usize,
    pub category_distribution: CategoryDistribution,
    /// Most recently started first
    pub sessions: Vec<SessionClassification>,
}

pub fn classify_sessions(
    db: &Database,
    days: u32,
    project: Option<&str>,
    min_events: i64,
) -> Result<ClassifyReport> {
    let window = TimeWindow::last_days(days);
    let mut activity = db.session_activity(&window, project, min_events)?;
    activity.sort_by(|a, b| b.first_seen.cmp(&a.first_seen));

    let mut classification = classify(&activity, min_events);
    let session_count = classification.sessions.len();
    classification.sessions.truncate(MAX_CLASSIFIED_SESSIONS);

    Ok(ClassifyReport {
        days,
        project: project.map(str::to_string),
        session_count,
        category_distribution: classification.distribution,
        sessions: classification.sessions,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapReport {
    pub days: u32,
    pub min_overlap_minutes: i64,
    pub sessions_analyzed: usize,
    pub overlap_count: usize,
    pub overlaps: Vec<OverlapPeriod>,
}

pub fn find_overlaps(db: &Database, days: u32, min_overlap_minutes: i64) -> Result<OverlapReport> {
    let spans = db.session_spans(&TimeWindow::last_days(days), None)?;
    let overlaps = detect_overlaps(&spans, min_overlap_minutes);

    Ok(OverlapReport {
        days,
        min_overlap_minutes,
        sessions_analyzed: spans.iter().filter(|s| s.event_count > 1).count(),
        overlap_count: overlaps.len(),
        overlaps,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub days: u32,
    pub compare_to: CompareMode,
    pub current_period: TimeWindow,
    pub previous_period: TimeWindow,
    #[serde(flatten)]
    pub comparison: PeriodComparison,
}

pub fn analyze_trends(db: &Database, days: u32, mode: CompareMode) -> Result<TrendReport> {
    let current_period = TimeWindow::last_days(days);
    let previous_period = mode.comparison_window(&current_period);

    let current = db.period_metrics(&current_period)?;
    let previous = db.period_metrics(&previous_period)?;

    Ok(TrendReport {
        days,
        compare_to: mode,
        current_period,
        previous_period,
        comparison: compare_periods(&current, &previous),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReworkReport {
    pub instances_detected: usize,
    pub rework_window_minutes: i64,
    pub examples: Vec<ReworkInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub days: u32,
    #[serde(flatten)]
    pub summary: FailureSummary,
    pub rework_patterns: ReworkReport,
}

pub fn analyze_failures(
    db: &Database,
    days: u32,
    rework_window_minutes: i64,
) -> Result<FailureReport> {
    let window = TimeWindow::last_days(days);
    let summary = summarize_failures(&db.errors_by_session(&window)?, &db.errors_by_tool(&window)?);

    let mut rework = detect_rework(
        &db.file_edits(&window)?,
        Duration::minutes(rework_window_minutes),
    );
    let instances_detected = rework.len();
    rework.truncate(MAX_REWORK_EXAMPLES);

    Ok(FailureReport {
        days,
        summary,
        rework_patterns: ReworkReport {
            instances_detected,
            rework_window_minutes,
            examples: rework,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapInsight {
    pub command: String,
    pub count: i64,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub events_direction: Direction,
    pub events_change_pct: f64,
    pub sessions_direction: Direction,
    pub sessions_change_pct: f64,
    pub error_rate_direction: Direction,
    pub significant_tool_changes: Vec<ToolChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureOverview {
    pub total_errors: i64,
    pub sessions_with_errors: usize,
    pub rework_instances: usize,
    pub top_error_tools: Vec<ToolErrors>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InsightSummary {
    pub total_tools: usize,
    pub total_commands: usize,
    pub total_sequences: usize,
    pub permission_gaps_found: usize,
    pub has_trends: bool,
    pub has_failure_analysis: bool,
    pub has_classification: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    pub tool_frequency: Vec<KeyCount>,
    pub command_frequency: Vec<KeyCount>,
    pub sequences: Vec<KeyCount>,
    pub permission_gaps: Vec<GapInsight>,
    pub summary: InsightSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<FailureOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_distribution: Option<CategoryDistribution>,
}

impl InsightsReport {
    fn add_pattern(&mut self, pattern: Pattern) {
        let entry = KeyCount {
            key: pattern.pattern_key,
            count: pattern.count,
        };
        match pattern.pattern_type {
            PatternType::ToolFrequency => self.tool_frequency.push(entry),
            PatternType::CommandFrequency => self.command_frequency.push(entry),
            PatternType::ToolSequence => self.sequences.push(entry),
            PatternType::PermissionGap => self.permission_gaps.push(GapInsight {
                suggestion: pattern
                    .metadata
                    .get("suggestion")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                command: entry.key,
                count: entry.count,
            }),
        }
    }
}

/// Stored patterns grouped by type, plus trend, failure and classification
/// summaries.
///
/// Patterns are recomputed first when none are stored or `refresh` is set.
/// Each summary is computed independently: one that fails is logged, left
/// out and flagged in `summary`.
pub fn get_insights(
    db: &Database,
    days: u32,
    refresh: bool,
    analysis: &AnalysisConfig,
    allowed_commands: &HashSet<String>,
) -> Result<InsightsReport> {
    let mut patterns = db.get_patterns(None)?;
    if patterns.is_empty() || refresh {
        compute_patterns(db, days, analysis, allowed_commands)?;
        patterns = db.get_patterns(None)?;
    }

    let mut report = InsightsReport::default();
    for pattern in patterns {
        report.add_pattern(pattern);
    }
    report.summary = InsightSummary {
        total_tools: report.tool_frequency.len(),
        total_commands: report.command_frequency.len(),
        total_sequences: report.sequences.len(),
        permission_gaps_found: report.permission_gaps.len(),
        ..InsightSummary::default()
    };

    match analyze_trends(db, days, CompareMode::Previous) {
        Ok(trends) => {
            let metrics = &trends.comparison.metrics;
            report.trends = Some(TrendSummary {
                events_direction: metrics.events.direction,
                events_change_pct: metrics.events.change_pct,
                sessions_direction: metrics.sessions.direction,
                sessions_change_pct: metrics.sessions.change_pct,
                error_rate_direction: metrics.error_rate.direction,
                significant_tool_changes: trends
                    .comparison
                    .tool_changes
                    .iter()
                    .take(3)
                    .filter(|t| t.change.direction != Direction::Unchanged)
                    .cloned()
                    .collect(),
            });
            report.summary.has_trends = true;
        }
        Err(err) => warn!(error = %err, "trend analysis failed"),
    }

    match analyze_failures(db, days, analysis.rework_window_minutes) {
        Ok(failures) => {
            report.failure_summary = Some(FailureOverview {
                total_errors: failures.summary.total_errors,
                sessions_with_errors: failures.summary.sessions_with_errors,
                rework_instances: failures.rework_patterns.instances_detected,
                top_error_tools: failures.summary.errors_by_tool.into_iter().take(3).collect(),
            });
            report.summary.has_failure_analysis = true;
        }
        Err(err) => warn!(error = %err, "failure analysis failed"),
    }

    match classify_sessions(db, days, None, analysis.min_session_events) {
        Ok(classified) => {
            report.session_distribution = Some(classified.category_distribution);
            report.summary.has_classification = true;
        }
        Err(err) => warn!(error = %err, "session classification failed"),
    }

    Ok(report)
}
