use chrono::NaiveDateTime;
use serde::Serialize;
use sessight_index::{Database, DbStats, TokenGrouping, TokenUsageRow};
use sessight_types::{TimeWindow, UsageCount};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFrequencyReport {
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub total_tool_calls: i64,
    pub tools: Vec<UsageCount>,
    /// Slash commands and skills invoked from the prompt
    pub slash_commands: Vec<UsageCount>,
}

pub fn tool_frequency(db: &Database, days: u32, project: Option<&str>) -> Result<ToolFrequencyReport> {
    let window = TimeWindow::last_days(days);
    let tools = db.tool_counts(&window, project)?;
    let slash_commands = db.slash_command_counts(&window, project)?;

    Ok(ToolFrequencyReport {
        days,
        project: project.map(str::to_string),
        total_tool_calls: tools.iter().map(|t| t.count).sum(),
        tools,
        slash_commands,
    })
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTotals {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cache_creation_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenUsageReport {
    pub days: u32,
    pub group_by: TokenGrouping,
    pub totals: TokenTotals,
    pub breakdown: Vec<TokenUsageRow>,
}

pub fn token_usage(
    db: &Database,
    days: u32,
    project: Option<&str>,
    group_by: TokenGrouping,
) -> Result<TokenUsageReport> {
    let breakdown = db.token_usage(&TimeWindow::last_days(days), project, group_by)?;
    let totals = breakdown.iter().fold(TokenTotals::default(), |mut acc, row| {
        acc.input_tokens += row.input_tokens;
        acc.output_tokens += row.output_tokens;
        acc.cache_read_tokens += row.cache_read_tokens;
        acc.cache_creation_tokens += row.cache_creation_tokens;
        acc
    });

    Ok(TokenUsageReport {
        days,
        group_by,
        totals,
        breakdown,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub stats: DbStats,
    pub last_ingestion: Option<NaiveDateTime>,
}

pub fn status(db: &Database) -> Result<StatusReport> {
    Ok(StatusReport {
        stats: db.stats()?,
        last_ingestion: db.last_ingestion_time()?,
    })
}
