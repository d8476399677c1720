//! Aggregate reads feeding the analytics engine. Every query takes a time
//! window over `events.timestamp` and, where useful, a project substring.

use rusqlite::Connection;
use sessight_types::{
    FileEdit, PeriodMetrics, SessionActivity, SessionSpan, TimeWindow, ToolStep, UsageCount,
};

use super::Filters;
use crate::Result;
use crate::convert::{opt_ts_column, ts_column};
use crate::records::{TokenGrouping, TokenUsageRow};

fn base_filters(window: &TimeWindow, project: Option<&str>) -> Filters {
    let mut filters = Filters::default();
    filters.window("timestamp", Some(window));
    filters.project("project_path", project);
    filters
}

fn grouped_counts(
    conn: &Connection,
    column: &str,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<UsageCount>> {
    let mut filters = base_filters(window, project);
    filters.push_raw(&format!("{} IS NOT NULL AND {} != ''", column, column));

    let sql = format!(
        r#"
        SELECT {col}, COUNT(*) AS n, MAX(timestamp)
        FROM events
        {where_sql}
        GROUP BY {col}
        ORDER BY n DESC, {col}
        "#,
        col = column,
        where_sql = filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(UsageCount {
                key: row.get(0)?,
                count: row.get(1)?,
                last_seen: opt_ts_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(counts)
}

pub fn tool_counts(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<UsageCount>> {
    grouped_counts(conn, "tool_name", window, project)
}

pub fn command_counts(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<UsageCount>> {
    grouped_counts(conn, "command", window, project)
}

/// Slash-command expansions grouped by name.
pub fn slash_command_counts(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<UsageCount>> {
    let mut filters = base_filters(window, project);
    filters.push_raw("entry_type = 'command'");
    filters.push_raw("skill_name IS NOT NULL");

    let sql = format!(
        r#"
        SELECT skill_name, COUNT(*) AS n, MAX(timestamp)
        FROM events
        {}
        GROUP BY skill_name
        ORDER BY n DESC, skill_name
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(UsageCount {
                key: row.get(0)?,
                count: row.get(1)?,
                last_seen: opt_ts_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(counts)
}

/// Tool invocations ordered by session, then time.
pub fn tool_steps(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<ToolStep>> {
    let mut filters = base_filters(window, project);
    filters.push_raw("tool_name IS NOT NULL");
    filters.push_raw("entry_type = 'tool_use'");

    let sql = format!(
        r#"
        SELECT session_id, project_path, timestamp, tool_name, file_path, command
        FROM events
        {}
        ORDER BY session_id, timestamp, id
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let steps = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(ToolStep {
                session_id: row.get(0)?,
                project_path: row.get(1)?,
                timestamp: ts_column(row, 2)?,
                tool_name: row.get(3)?,
                file_path: row.get(4)?,
                command: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(steps)
}

/// First and last event of every session active inside the window.
///
/// The window only selects sessions; bounds and counts cover all of their
/// events, so a session that started before the window keeps its real start.
pub fn session_spans(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
) -> Result<Vec<SessionSpan>> {
    let filters = base_filters(window, project);

    let sql = format!(
        r#"
        SELECT session_id, MIN(project_path), MIN(timestamp), MAX(timestamp), COUNT(*)
        FROM events
        WHERE session_id IN (SELECT DISTINCT session_id FROM events {})
        GROUP BY session_id
        ORDER BY MIN(timestamp), session_id
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let spans = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(SessionSpan {
                session_id: row.get(0)?,
                project_path: row.get(1)?,
                start: ts_column(row, 2)?,
                end: ts_column(row, 3)?,
                event_count: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(spans)
}

/// Per-session activity counters for sessions with at least `min_events`.
pub fn session_activity(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
    min_events: i64,
) -> Result<Vec<SessionActivity>> {
    let mut filters = base_filters(window, project);
    filters.bind(min_events);

    let sql = format!(
        r#"
        SELECT
            session_id,
            MIN(project_path),
            COUNT(*),
            SUM(CASE WHEN tool_name IN ('Edit', 'MultiEdit') THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Read' THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Write' THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name IN ('Grep', 'Glob', 'WebSearch') THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Bash' AND command IN ('git', 'gh') THEN 1 ELSE 0 END),
            SUM(CASE WHEN tool_name = 'Bash' AND command IN ('make', 'cargo', 'npm', 'pytest') THEN 1 ELSE 0 END),
            SUM(CASE WHEN is_error = 1 THEN 1 ELSE 0 END),
            MIN(timestamp),
            MAX(timestamp)
        FROM events
        {}
        GROUP BY session_id
        HAVING COUNT(*) >= ?
        ORDER BY MIN(timestamp), session_id
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let activity = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(SessionActivity {
                session_id: row.get(0)?,
                project_path: row.get(1)?,
                total_events: row.get(2)?,
                edit_count: row.get(3)?,
                read_count: row.get(4)?,
                write_count: row.get(5)?,
                search_count: row.get(6)?,
                git_count: row.get(7)?,
                build_count: row.get(8)?,
                error_count: row.get(9)?,
                first_seen: opt_ts_column(row, 10)?,
                last_seen: opt_ts_column(row, 11)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(activity)
}

pub fn period_metrics(conn: &Connection, window: &TimeWindow) -> Result<PeriodMetrics> {
    let filters = base_filters(window, None);

    let (events, sessions, errors, input_tokens, output_tokens) = conn.query_row(
        &format!(
            r#"
            SELECT
                COUNT(*),
                COUNT(DISTINCT session_id),
                COALESCE(SUM(CASE WHEN is_error = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(input_tokens), 0),
                COALESCE(SUM(output_tokens), 0)
            FROM events
            {}
            "#,
            filters.where_sql()
        ),
        filters.params().as_slice(),
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        },
    )?;

    let tool_counts = tool_counts(conn, window, None)?
        .into_iter()
        .map(|c| (c.key, c.count))
        .collect();

    Ok(PeriodMetrics {
        events,
        sessions,
        errors,
        input_tokens,
        output_tokens,
        tool_counts,
    })
}

/// Error counts per session, most errors first.
pub fn errors_by_session(conn: &Connection, window: &TimeWindow) -> Result<Vec<UsageCount>> {
    let mut filters = base_filters(window, None);
    filters.push_raw("is_error = 1");

    let sql = format!(
        r#"
        SELECT session_id, COUNT(*) AS n, MAX(timestamp)
        FROM events
        {}
        GROUP BY session_id
        ORDER BY n DESC, session_id
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(UsageCount {
                key: row.get(0)?,
                count: row.get(1)?,
                last_seen: opt_ts_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(counts)
}

/// Failed tool results attributed to the tool that produced them.
pub fn errors_by_tool(conn: &Connection, window: &TimeWindow) -> Result<Vec<UsageCount>> {
    let mut filters = Filters::default();
    filters.window("r.timestamp", Some(window));

    let sql = format!(
        r#"
        SELECT u.tool_name, COUNT(*) AS n, MAX(r.timestamp)
        FROM events r
        JOIN events u
          ON u.tool_id = r.tool_id
         AND u.session_id = r.session_id
         AND u.entry_type = 'tool_use'
        {} AND r.is_error = 1 AND r.entry_type = 'tool_result' AND u.tool_name IS NOT NULL
        GROUP BY u.tool_name
        ORDER BY n DESC, u.tool_name
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(UsageCount {
                key: row.get(0)?,
                count: row.get(1)?,
                last_seen: opt_ts_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(counts)
}

/// Edits with a file path, ordered by session, file, then time.
pub fn file_edits(conn: &Connection, window: &TimeWindow) -> Result<Vec<FileEdit>> {
    let mut filters = base_filters(window, None);
    filters.push_raw("tool_name IN ('Edit', 'MultiEdit')");
    filters.push_raw("file_path IS NOT NULL");

    let sql = format!(
        r#"
        SELECT session_id, file_path, timestamp
        FROM events
        {}
        ORDER BY session_id, file_path, timestamp
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let edits = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(FileEdit {
                session_id: row.get(0)?,
                file_path: row.get(1)?,
                timestamp: ts_column(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(edits)
}

pub fn token_usage(
    conn: &Connection,
    window: &TimeWindow,
    project: Option<&str>,
    grouping: TokenGrouping,
) -> Result<Vec<TokenUsageRow>> {
    let mut filters = base_filters(window, project);
    let (key_expr, order) = match grouping {
        TokenGrouping::Day => ("DATE(timestamp)", "group_key DESC"),
        TokenGrouping::Session => ("session_id", "total_tokens DESC, group_key"),
        TokenGrouping::Model => {
            filters.push_raw("model IS NOT NULL");
            ("model", "total_tokens DESC, group_key")
        }
    };

    let sql = format!(
        r#"
        SELECT
            {key_expr} AS group_key,
            COALESCE(SUM(input_tokens), 0),
            COALESCE(SUM(output_tokens), 0),
            COALESCE(SUM(cache_read_tokens), 0),
            COALESCE(SUM(cache_creation_tokens), 0),
            COUNT(*),
            COALESCE(SUM(input_tokens), 0) + COALESCE(SUM(output_tokens), 0) AS total_tokens
        FROM events
        {where_sql}
        GROUP BY group_key
        ORDER BY {order}
        "#,
        key_expr = key_expr,
        where_sql = filters.where_sql(),
        order = order
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(filters.params().as_slice(), |row| {
            Ok(TokenUsageRow {
                key: row.get(0)?,
                input_tokens: row.get(1)?,
                output_tokens: row.get(2)?,
                cache_read_tokens: row.get(3)?,
                cache_creation_tokens: row.get(4)?,
                event_count: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
