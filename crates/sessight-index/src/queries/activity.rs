//! Breakdowns of stored events by file, project, agent and failed call.

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, params};
use sessight_types::{
    AgentActivity, AgentToolCount, ErrorDetail, FileActivity, ProjectActivity, RelatedSession,
    TimeWindow,
};

use super::Filters;
use crate::Result;
use crate::convert::{opt_ts_column, ts_column, ts_to_sql};
use crate::records::RelatedBy;

fn base_filters(window: &TimeWindow, project: Option<&str>) -> Filters {
    let mut filters = Filters::default();
    filters.window("timestamp", Some(window));
    filters.project("project_path", project);
    filters
}

/// Read, Edit and Write calls per file, busiest first.
pub fn file_activity(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<FileActivity>> {
    let mut filters = base_filters(window, project);
    filters.push_raw("tool_name IN ('Read', 'Edit', 'Write')");
    filters.push_raw("file_path IS NOT NULL");

    let sql = format!(
        r#"
        SELECT
            file_path,
            SUM(CASE WHEN tool_name = 'Read' THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Edit' THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Write' THEN 1 ELSE 0 END),
            COUNT(*) AS n
        FROM events
        {}
        GROUP BY file_path
        ORDER BY n DESC, file_path
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let files = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(FileActivity {
                file_path: row.get(0)?,
                reads: row.get(1)?,
                edits: row.get(2)?,
                writes: row.get(3)?,
                total: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(files)
}

/// Events and distinct sessions per project, most events first.
pub fn project_activity(conn: &Connection, window: &TimeWindow) -> Result<Vec<ProjectActivity>> {
    let mut filters = base_filters(window, None);
    filters.push_raw("project_path IS NOT NULL");

    let sql = format!(
        r#"
        SELECT project_path, COUNT(*) AS n, COUNT(DISTINCT session_id)
        FROM events
        {}
        GROUP BY project_path
        ORDER BY n DESC, project_path
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let projects = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(ProjectActivity {
                project_path: row.get(0)?,
                events: row.get(1)?,
                sessions: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(projects)
}

/// Counters per `agent_id`; the row without an agent is the main
/// conversation. Highest input token usage first.
pub fn agent_activity(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<AgentActivity>> {
    let filters = base_filters(window, project);

    let sql = format!(
        r#"
        SELECT
            agent_id,
            COUNT(*),
            SUM(CASE WHEN entry_type = 'tool_use' THEN 1 ELSE 0 END),
            SUM(COALESCE(input_tokens, 0)) AS input,
            SUM(COALESCE(output_tokens, 0)),
            SUM(COALESCE(cache_read_tokens, 0)),
            SUM(CASE WHEN is_sidechain = 1 THEN 1 ELSE 0 END),
            MIN(timestamp),
            MAX(timestamp)
        FROM events
        {}
        GROUP BY agent_id
        ORDER BY input DESC, agent_id
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let agents = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(AgentActivity {
                agent_id: row.get(0)?,
                event_count: row.get(1)?,
                tool_use_count: row.get(2)?,
                input_tokens: row.get(3)?,
                output_tokens: row.get(4)?,
                cache_read_tokens: row.get(5)?,
                sidechain_events: row.get(6)?,
                first_seen: opt_ts_column(row, 7)?,
                last_seen: opt_ts_column(row, 8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(agents)
}

/// Tool calls per sub-agent, ordered by agent then most used tool.
pub fn agent_tool_counts(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<AgentToolCount>> {
    let mut filters = base_filters(window, project);
    filters.push_raw("agent_id IS NOT NULL");
    filters.push_raw("tool_name IS NOT NULL");

    let sql = format!(
        r#"
        SELECT agent_id, tool_name, COUNT(*) AS n
        FROM events
        {}
        GROUP BY agent_id, tool_name
        ORDER BY agent_id, n DESC, tool_name
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(AgentToolCount {
                agent_id: row.get(0)?,
                tool_name: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(counts)
}

/// Failed tool results joined back to the call that produced them, grouped
/// by the call's arguments.
pub fn error_details(
    conn: &Connection,
    window: &TimeWindow,
    tool: Option<&str>,
) -> Result<Vec<ErrorDetail>> {
    let mut filters = Filters::default();
    filters.window("r.timestamp", Some(window));
    filters.push_raw("r.entry_type = 'tool_result'");
    filters.push_raw("r.is_error = 1");
    filters.push_raw("u.tool_name IS NOT NULL");
    if let Some(tool) = tool {
        filters.push("u.tool_name = ?", tool.to_string());
    }

    let sql = format!(
        r#"
        SELECT
            u.tool_name,
            u.command,
            u.file_path,
            json_extract(u.tool_input_json, '$.pattern') AS pattern,
            json_extract(u.tool_input_json, '$.path') AS search_path,
            r.project_path,
            COUNT(*) AS n
        FROM events r
        JOIN events u ON u.tool_id = r.tool_id AND u.entry_type = 'tool_use'
        {}
        GROUP BY u.tool_name, u.command, u.file_path, pattern, search_path, r.project_path
        ORDER BY u.tool_name, n DESC, u.command, u.file_path, pattern
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let details = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(ErrorDetail {
                tool_name: row.get(0)?,
                command: row.get(1)?,
                file_path: row.get(2)?,
                pattern: row.get(3)?,
                search_path: row.get(4)?,
                project_path: row.get(5)?,
                error_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(details)
}

// Neighbours for temporal relation are searched this far around the session
const TEMPORAL_SLACK_HOURS: i64 = 1;

/// Sessions that share files or commands with `session_id` inside the
/// window, or that ran within an hour of it.
pub fn related_sessions(
    conn: &Connection,
    session_id: &str,
    by: RelatedBy,
    window: &TimeWindow,
    limit: usize,
) -> Result<Vec<RelatedSession>> {
    let (sql, lower, upper) = match by {
        RelatedBy::Files | RelatedBy::Commands => {
            let column = if by == RelatedBy::Files {
                "file_path"
            } else {
                "command"
            };
            let sql = format!(
                r#"
                SELECT session_id, MIN(project_path), COUNT(DISTINCT {col}) AS n,
                       MIN(timestamp), MAX(timestamp)
                FROM events
                WHERE session_id != ?1
                  AND timestamp >= ?2 AND timestamp < ?3
                  AND {col} IN (
                      SELECT DISTINCT {col} FROM events
                      WHERE session_id = ?1 AND {col} IS NOT NULL
                  )
                GROUP BY session_id
                ORDER BY n DESC, session_id
                LIMIT ?4
                "#,
                col = column
            );
            (sql, ts_to_sql(&window.start), ts_to_sql(&window.end))
        }
        RelatedBy::Temporal => {
            let Some((start, end)) = session_bounds(conn, session_id)? else {
                return Ok(Vec::new());
            };
            let slack = Duration::hours(TEMPORAL_SLACK_HOURS);
            let sql = r#"
                SELECT session_id, MIN(project_path), COUNT(*),
                       MIN(timestamp) AS first, MAX(timestamp)
                FROM events
                WHERE session_id != ?1
                  AND timestamp >= ?2 AND timestamp <= ?3
                GROUP BY session_id
                ORDER BY first, session_id
                LIMIT ?4
            "#
            .to_string();
            (sql, ts_to_sql(&(start - slack)), ts_to_sql(&(end + slack)))
        }
    };

    let mut stmt = conn.prepare(&sql)?;
    let related = stmt
        .query_map(params![session_id, lower, upper, limit as i64], |row| {
            Ok(RelatedSession {
                session_id: row.get(0)?,
                project_path: row.get(1)?,
                shared: row.get(2)?,
                first_seen: ts_column(row, 3)?,
                last_seen: ts_column(row, 4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(related)
}

fn session_bounds(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
    let bounds = conn.query_row(
        "SELECT MIN(timestamp), MAX(timestamp) FROM events WHERE session_id = ?1",
        [session_id],
        |row| Ok((opt_ts_column(row, 0)?, opt_ts_column(row, 1)?)),
    )?;

    Ok(match bounds {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    })
}
