use serde::Serialize;
use sessight_engine::{
    AgentBreakdown, McpServerUsage, ToolFailures, group_error_details, mcp_servers,
    merge_file_activity, project_name, summarize_agents,
};
use sessight_index::Database;
use sessight_types::{FileActivity, TimeWindow};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileActivityReport {
    pub days: u32,
    pub collapse_worktrees: bool,
    /// Distinct files before the limit
    pub file_count: usize,
    pub files: Vec<FileActivity>,
}

/// Reads, edits and writes per file, busiest first.
pub fn file_activity(
    db: &Database,
    days: u32,
    project: Option<&str>,
    limit: usize,
    collapse_worktrees: bool,
) -> Result<FileActivityReport> {
    let rows = db.file_activity(&TimeWindow::last_days(days), project)?;
    let mut files = merge_file_activity(rows, collapse_worktrees);
    let file_count = files.len();
    files.truncate(limit);

    Ok(FileActivityReport {
        days,
        collapse_worktrees,
        file_count,
        files,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub name: String,
    pub events: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectsReport {
    pub days: u32,
    pub project_count: usize,
    pub projects: Vec<ProjectSummary>,
}

/// Activity across every project, most events first.
pub fn projects(db: &Database, days: u32) -> Result<ProjectsReport> {
    let projects: Vec<ProjectSummary> = db
        .project_activity(&TimeWindow::last_days(days))?
        .into_iter()
        .map(|p| ProjectSummary {
            name: project_name(&p.project_path),
            project: p.project_path,
            events: p.events,
            sessions: p.sessions,
        })
        .collect();

    Ok(ProjectsReport {
        days,
        project_count: projects.len(),
        projects,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpUsageReport {
    pub days: u32,
    pub total_mcp_calls: i64,
    pub servers: Vec<McpServerUsage>,
}

/// Calls of MCP tools grouped by server.
pub fn mcp_usage(db: &Database, days: u32, project: Option<&str>) -> Result<McpUsageReport> {
    let counts = db.tool_counts(&TimeWindow::last_days(days), project)?;
    let servers = mcp_servers(&counts);

    Ok(McpUsageReport {
        days,
        total_mcp_calls: servers.iter().map(|s| s.total).sum(),
        servers,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentActivityReport {
    pub days: u32,
    #[serde(flatten)]
    pub breakdown: AgentBreakdown,
}

/// Work done by sub-agents compared with the main conversation.
pub fn agent_activity(
    db: &Database,
    days: u32,
    project: Option<&str>,
) -> Result<AgentActivityReport> {
    let window = TimeWindow::last_days(days);
    let activity = db.agent_activity(&window, project)?;
    let tools = db.agent_tool_counts(&window, project)?;
    debug!(rows = activity.len(), "loaded agent activity");

    Ok(AgentActivityReport {
        days,
        breakdown: summarize_agents(activity, &tools),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetailsReport {
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub total_errors: i64,
    pub errors_by_tool: BTreeMap<String, ToolFailures>,
}

/// Failed calls with the arguments that made them fail, at most `limit` per
/// tool.
pub fn error_details(
    db: &Database,
    days: u32,
    tool: Option<&str>,
    limit: usize,
) -> Result<ErrorDetailsReport> {
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".to_string()));
    }
    let details = db.error_details(&TimeWindow::last_days(days), tool)?;
    let errors_by_tool = group_error_details(&details, limit);

    Ok(ErrorDetailsReport {
        days,
        tool: tool.map(str::to_string),
        total_errors: errors_by_tool.values().map(|t| t.total).sum(),
        errors_by_tool,
    })
}
