//! Reshaping of per-file, per-project, per-agent and per-server counts.

use chrono::NaiveDateTime;
use serde::Serialize;
use sessight_types::{AgentActivity, AgentToolCount, Event, FileActivity, UsageCount};
use std::collections::{BTreeSet, HashMap};

const WORKTREE_DIR: &str = ".worktrees/";
const MCP_PREFIX: &str = "mcp__";
const MAX_AGENT_TOOLS: usize = 5;
/// Path components after which the next component names the project
const PROJECT_ROOTS: [&str; 4] = ["projects", "repos", "src", "Documents"];

/// Drop every `.worktrees/<branch>/` segment so that files edited in
/// different worktrees of one repository count together.
pub fn collapse_worktree(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(idx) = rest.find(WORKTREE_DIR) {
        let after = &rest[idx + WORKTREE_DIR.len()..];
        let Some(slash) = after.find('/') else {
            break;
        };
        out.push_str(&rest[..idx]);
        rest = &after[slash + 1..];
    }
    out.push_str(rest);
    out
}

/// Merge rows that share a path (after optional worktree collapsing),
/// busiest file first.
pub fn merge_file_activity(
    rows: Vec<FileActivity>,
    collapse_worktrees: bool,
) -> Vec<FileActivity> {
    let mut merged: HashMap<String, FileActivity> = HashMap::new();
    for row in rows {
        let path = if collapse_worktrees {
            collapse_worktree(&row.file_path)
        } else {
            row.file_path.clone()
        };
        let entry = merged.entry(path.clone()).or_insert_with(|| FileActivity {
            file_path: path,
            ..FileActivity::default()
        });
        entry.reads += row.reads;
        entry.edits += row.edits;
        entry.writes += row.writes;
        entry.total += row.total;
    }

    let mut files: Vec<FileActivity> = merged.into_values().collect();
    files.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.file_path.cmp(&b.file_path)));
    files
}

/// Short name for a project directory.
///
/// Project paths are encoded directory names (`-home-me-projects-app`), so
/// both `/` and `-` separate components. The component after a well-known
/// root such as `projects` wins, with the rest of the path kept so that
/// hyphenated names survive; otherwise the last component is used.
pub fn project_name(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '-']);
    let parts: Vec<&str> = trimmed
        .split(['/', '-'])
        .filter(|p| !p.is_empty())
        .collect();

    if let Some(idx) = parts.iter().position(|p| PROJECT_ROOTS.contains(p))
        && idx + 1 < parts.len()
    {
        return parts[idx + 1..].join("-");
    }
    parts
        .last()
        .map(|p| p.to_string())
        .unwrap_or_else(|| path.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServerUsage {
    pub server: String,
    pub total: i64,
    pub tools: Vec<ToolCount>,
}

/// Group `mcp__<server>__<tool>` counts by server, busiest server first.
///
/// Names without a tool part land under `unknown`; tool names may contain
/// `__` themselves. Other tools are ignored.
pub fn mcp_servers(tool_counts: &[UsageCount]) -> Vec<McpServerUsage> {
    let mut servers: Vec<McpServerUsage> = Vec::new();

    for count in tool_counts.iter().filter(|c| c.key.starts_with(MCP_PREFIX)) {
        let (server, tool) = match count.key[MCP_PREFIX.len()..].split_once("__") {
            Some((server, tool)) if !tool.is_empty() => (server, tool),
            _ => ("unknown", count.key.as_str()),
        };

        let idx = match servers.iter().position(|s| s.server == server) {
            Some(idx) => idx,
            None => {
                servers.push(McpServerUsage {
                    server: server.to_string(),
                    total: 0,
                    tools: Vec::new(),
                });
                servers.len() - 1
            }
        };
        servers[idx].total += count.count;
        servers[idx].tools.push(ToolCount {
            tool: tool.to_string(),
            count: count.count,
        });
    }

    for server in &mut servers {
        server
            .tools
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tool.cmp(&b.tool)));
    }
    servers.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.server.cmp(&b.server)));
    servers
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUsage {
    #[serde(flatten)]
    pub activity: AgentActivity,
    /// Up to five most used tools
    pub top_tools: Vec<ToolCount>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub agent_count: usize,
    pub total_agent_events: i64,
    pub total_agent_tokens: i64,
    pub total_main_tokens: i64,
    /// Share of input tokens spent by sub-agents, one decimal
    pub agent_token_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentBreakdown {
    pub main_session: Option<AgentActivity>,
    pub agents: Vec<AgentUsage>,
    pub summary: AgentSummary,
}

/// Split per-agent rows into the main conversation and sub-agents, and
/// attach each sub-agent's top tools.
///
/// `tool_counts` is expected ordered by agent, then most used tool.
pub fn summarize_agents(
    activity: Vec<AgentActivity>,
    tool_counts: &[AgentToolCount],
) -> AgentBreakdown {
    let mut main_session = None;
    let mut agents = Vec::new();

    for row in activity {
        let Some(agent_id) = row.agent_id.clone() else {
            main_session = Some(row);
            continue;
        };
        let top_tools = tool_counts
            .iter()
            .filter(|t| t.agent_id == agent_id)
            .take(MAX_AGENT_TOOLS)
            .map(|t| ToolCount {
                tool: t.tool_name.clone(),
                count: t.count,
            })
            .collect();
        agents.push(AgentUsage {
            activity: row,
            top_tools,
        });
    }

    let total_agent_tokens: i64 = agents.iter().map(|a| a.activity.input_tokens).sum();
    let total_main_tokens = main_session.as_ref().map_or(0, |m| m.input_tokens);
    let all_tokens = total_agent_tokens + total_main_tokens;
    let agent_token_percentage = if all_tokens > 0 {
        (total_agent_tokens as f64 / all_tokens as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    AgentBreakdown {
        summary: AgentSummary {
            agent_count: agents.len(),
            total_agent_events: agents.iter().map(|a| a.activity.event_count).sum(),
            total_agent_tokens,
            total_main_tokens,
            agent_token_percentage,
        },
        main_session,
        agents,
    }
}

/// One message of a cross-session timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyStep {
    pub timestamp: NaiveDateTime,
    pub session_id: String,
    pub entry_type: String,
    pub project: String,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Journey {
    pub steps: Vec<JourneyStep>,
    pub projects_visited: Vec<String>,
    /// Times consecutive messages moved to a different project
    pub project_switches: usize,
}

/// Lay out message events in order, counting moves between projects.
///
/// Messages longer than `max_chars` are cut; zero keeps them whole. Events
/// without message text are skipped.
pub fn trace_journey(events: &[Event], max_chars: usize) -> Journey {
    let mut journey = Journey::default();
    let mut visited = BTreeSet::new();
    let mut last_project: Option<&str> = None;

    for event in events {
        let Some(text) = event.user_message_text.as_deref() else {
            continue;
        };
        let project = event.project_path.as_str();
        if !project.is_empty() {
            if last_project.is_some_and(|last| last != project) {
                journey.project_switches += 1;
            }
            last_project = Some(project);
            visited.insert(project.to_string());
        }

        let message = if max_chars > 0 {
            text.chars().take(max_chars).collect()
        } else {
            text.to_string()
        };
        journey.steps.push(JourneyStep {
            timestamp: event.timestamp,
            session_id: event.session_id.clone(),
            entry_type: event.entry_type.to_string(),
            project: event.project_path.clone(),
            message,
        });
    }

    journey.projects_visited = visited.into_iter().collect();
    journey
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::at;
    use sessight_types::EntryType;

    fn usage(key: &str, count: i64) -> UsageCount {
        UsageCount {
            key: key.to_string(),
            count,
            last_seen: None,
        }
    }

    fn file(path: &str, reads: i64, edits: i64) -> FileActivity {
        FileActivity {
            file_path: path.to_string(),
            reads,
            edits,
            writes: 0,
            total: reads + edits,
        }
    }

    #[test]
    fn test_collapse_worktree() {
        assert_eq!(
            collapse_worktree("/repo/.worktrees/feature-x/src/lib.rs"),
            "/repo/src/lib.rs"
        );
        assert_eq!(collapse_worktree("/repo/src/lib.rs"), "/repo/src/lib.rs");
        assert_eq!(
            collapse_worktree("/repo/.worktrees/dangling"),
            "/repo/.worktrees/dangling"
        );
    }

    #[test]
    fn test_worktree_files_merge() {
        let rows = vec![
            file("/repo/src/lib.rs", 2, 1),
            file("/repo/.worktrees/fix/src/lib.rs", 1, 3),
            file("/repo/README.md", 1, 0),
        ];

        let merged = merge_file_activity(rows.clone(), true);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].file_path, "/repo/src/lib.rs");
        assert_eq!((merged[0].reads, merged[0].edits, merged[0].total), (3, 4, 7));

        let separate = merge_file_activity(rows, false);
        assert_eq!(separate.len(), 3);
        assert_eq!(separate[0].file_path, "/repo/.worktrees/fix/src/lib.rs");
    }

    #[test]
    fn test_project_name() {
        assert_eq!(project_name("-Users-me-projects-sessight"), "sessight");
        assert_eq!(project_name("-home-me-repos-my-app"), "my-app");
        assert_eq!(project_name("/home/me/src/tool/"), "tool");
        assert_eq!(project_name("-work-app"), "app");
        assert_eq!(project_name(""), "");
    }

    #[test]
    fn test_mcp_servers() {
        let counts = vec![
            usage("Read", 40),
            usage("mcp__github__create_issue", 2),
            usage("mcp__memory__store__batch", 5),
            usage("mcp__github__list_prs", 4),
            usage("mcp__odd", 1),
        ];

        let servers = mcp_servers(&counts);
        let totals: Vec<(&str, i64)> = servers
            .iter()
            .map(|s| (s.server.as_str(), s.total))
            .collect();
        assert_eq!(totals, vec![("github", 6), ("memory", 5), ("unknown", 1)]);
        assert_eq!(servers[0].tools[0].tool, "list_prs");
        assert_eq!(servers[1].tools[0].tool, "store__batch");
        assert_eq!(servers[2].tools[0].tool, "mcp__odd");
    }

    fn agent(id: Option<&str>, events: i64, input: i64) -> AgentActivity {
        AgentActivity {
            agent_id: id.map(str::to_string),
            event_count: events,
            tool_use_count: 0,
            input_tokens: input,
            output_tokens: 0,
            cache_read_tokens: 0,
            sidechain_events: 0,
            first_seen: None,
            last_seen: None,
        }
    }

    #[test]
    fn test_summarize_agents() {
        let tools: Vec<AgentToolCount> = ["Grep", "Read", "Glob", "Bash", "Edit", "Write"]
            .iter()
            .enumerate()
            .map(|(i, tool)| AgentToolCount {
                agent_id: "a1".to_string(),
                tool_name: tool.to_string(),
                count: 10 - i as i64,
            })
            .collect();

        let breakdown = summarize_agents(
            vec![agent(Some("a1"), 8, 300), agent(None, 20, 100)],
            &tools,
        );
        assert_eq!(breakdown.main_session.unwrap().event_count, 20);
        assert_eq!(breakdown.agents.len(), 1);
        assert_eq!(breakdown.agents[0].top_tools.len(), 5);
        assert_eq!(breakdown.agents[0].top_tools[0].tool, "Grep");
        assert_eq!(breakdown.summary.total_agent_events, 8);
        assert_eq!(breakdown.summary.agent_token_percentage, 75.0);

        let empty = summarize_agents(Vec::new(), &[]);
        assert_eq!(empty.summary, AgentSummary::default());
    }

    fn message(session: &str, minute: i64, project: &str, text: Option<&str>) -> Event {
        Event {
            user_message_text: text.map(str::to_string),
            ..Event::new(format!("u{}", minute), session, at(minute), project, EntryType::User)
        }
    }

    #[test]
    fn test_trace_journey_counts_project_switches() {
        let events = vec![
            message("s1", 0, "-work-api", Some("start the api")),
            message("s2", 1, "-work-web", Some("now the web client")),
            message("s2", 2, "-work-web", None),
            message("s1", 3, "-work-api", Some("back to the api")),
        ];

        let journey = trace_journey(&events, 5);
        assert_eq!(journey.steps.len(), 3);
        assert_eq!(journey.steps[0].message, "start");
        assert_eq!(journey.project_switches, 2);
        assert_eq!(journey.projects_visited, vec!["-work-api", "-work-web"]);

        assert_eq!(trace_journey(&events, 0).steps[1].message, "now the web client");
    }
}
