use chrono::NaiveDateTime;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use sessight_engine::{
    Occurrence, find_occurrences, find_permission_gaps, mine_sequences, parse_sequence_pattern,
    sample_occurrences,
};
use sessight_index::Database;
use sessight_types::{Pattern, PatternType, TimeWindow, UsageCount, utc_now};
use std::collections::HashSet;
use tracing::info;

use crate::Result;
use crate::config::AnalysisConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternReport {
    pub days: u32,
    pub tool_frequency: usize,
    pub command_frequency: usize,
    pub tool_sequence: usize,
    pub permission_gap: usize,
    pub total: usize,
    pub computed_at: NaiveDateTime,
}

fn usage_pattern(kind: PatternType, usage: &UsageCount, now: NaiveDateTime) -> Pattern {
    Pattern::new(kind, usage.key.clone(), usage.count, now).with_last_seen(usage.last_seen)
}

/// Recompute every pattern type over the last `days` days and replace the
/// stored set in one transaction.
pub fn compute_patterns(
    db: &Database,
    days: u32,
    analysis: &AnalysisConfig,
    allowed_commands: &HashSet<String>,
) -> Result<PatternReport> {
    let window = TimeWindow::last_days(days);
    let now = utc_now();

    let tools = db.tool_counts(&window, None)?;
    let commands = db.command_counts(&window, None)?;
    let sequences = mine_sequences(
        &db.tool_steps(&window, None)?,
        analysis.sequence_length,
        analysis.min_sequence_count,
    );
    let gaps = find_permission_gaps(&commands, allowed_commands, analysis.permission_threshold);

    let mut patterns = Vec::with_capacity(tools.len() + commands.len() + sequences.len());
    patterns.extend(
        tools
            .iter()
            .map(|t| usage_pattern(PatternType::ToolFrequency, t, now)),
    );
    patterns.extend(
        commands
            .iter()
            .map(|c| usage_pattern(PatternType::CommandFrequency, c, now)),
    );
    patterns.extend(sequences.iter().map(|s| {
        Pattern::new(PatternType::ToolSequence, s.key.clone(), s.count, now)
            .with_last_seen(Some(s.last_seen))
            .with_metadata("sequence", json!(s.tools))
    }));
    patterns.extend(gaps.iter().map(|g| {
        let last_seen = commands
            .iter()
            .find(|c| c.key == g.command)
            .and_then(|c| c.last_seen);
        Pattern::new(PatternType::PermissionGap, g.command.clone(), g.count, now)
            .with_last_seen(last_seen)
            .with_metadata("suggestion", json!(g.suggestion))
    }));

    let total = db.replace_patterns(&PatternType::ALL, &patterns)?;

    let report = PatternReport {
        days,
        tool_frequency: tools.len(),
        command_frequency: commands.len(),
        tool_sequence: sequences.len(),
        permission_gap: gaps.len(),
        total,
        computed_at: now,
    };
    info!(
        tools = report.tool_frequency,
        commands = report.command_frequency,
        sequences = report.tool_sequence,
        gaps = report.permission_gap,
        "patterns computed"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub pattern: String,
    pub tools: Vec<String>,
    pub days: u32,
    pub total_occurrences: usize,
    pub samples: Vec<Occurrence>,
}

/// Draw up to `count` random occurrences of a tool sequence such as
/// `"Read → Edit"`, each with `context` surrounding steps.
pub fn sample_sequences<R: Rng + ?Sized>(
    db: &Database,
    pattern: &str,
    count: usize,
    context: usize,
    days: u32,
    rng: &mut R,
) -> Result<SampleReport> {
    let tools = parse_sequence_pattern(pattern)?;
    let steps = db.tool_steps(&TimeWindow::last_days(days), None)?;

    let occurrences = find_occurrences(&steps, &tools, context);
    let total_occurrences = occurrences.len();
    let samples = sample_occurrences(occurrences, count, rng);

    Ok(SampleReport {
        pattern: pattern.to_string(),
        tools,
        days,
        total_occurrences,
        samples,
    })
}
