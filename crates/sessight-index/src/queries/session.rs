use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sessight_types::Session;

use crate::Result;
use crate::convert::{ts_column, ts_to_sql};

const SESSION_COLUMNS: &str = r#"
    id, project_path, first_seen, last_seen, entry_count, tool_use_count,
    total_input_tokens, total_output_tokens, primary_branch
"#;

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        project_path: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        first_seen: ts_column(row, 2)?,
        last_seen: ts_column(row, 3)?,
        entry_count: row.get(4)?,
        tool_use_count: row.get(5)?,
        total_input_tokens: row.get(6)?,
        total_output_tokens: row.get(7)?,
        primary_branch: row.get(8)?,
    })
}

/// Replace the whole row for `session.id`.
pub fn upsert(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            SESSION_COLUMNS
        ),
        params![
            &session.id,
            &session.project_path,
            ts_to_sql(&session.first_seen),
            ts_to_sql(&session.last_seen),
            session.entry_count,
            session.tool_use_count,
            session.total_input_tokens,
            session.total_output_tokens,
            &session.primary_branch,
        ],
    )?;

    Ok(())
}

pub fn get_by_id(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
            [session_id],
            session_from_row,
        )
        .optional()?;

    Ok(session)
}

pub fn list(conn: &Connection, project: Option<&str>, limit: Option<usize>) -> Result<Vec<Session>> {
    let mut filters = super::Filters::default();
    filters.project("project_path", project);

    let limit_clause = limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM sessions {} ORDER BY last_seen DESC, id {}",
        SESSION_COLUMNS,
        filters.where_sql(),
        limit_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let sessions = stmt
        .query_map(filters.params().as_slice(), session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(sessions)
}

/// Sessions whose last event is at or after `since`, most recent first.
pub fn list_active_since(
    conn: &Connection,
    since: &NaiveDateTime,
    project: Option<&str>,
) -> Result<Vec<Session>> {
    let mut filters = super::Filters::default();
    filters.push("last_seen >= ?", ts_to_sql(since));
    filters.project("project_path", project);

    let sql = format!(
        "SELECT {} FROM sessions {} ORDER BY last_seen DESC, id",
        SESSION_COLUMNS,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let sessions = stmt
        .query_map(filters.params().as_slice(), session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(sessions)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
}

/// Rebuild every session row from events.
///
/// Sessions whose events are gone disappear as well. Returns the number of
/// rows written.
pub fn recompute_all(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;

    tx.execute("DELETE FROM sessions", [])?;
    let written = tx.execute(
        r#"
        INSERT INTO sessions (
            id, project_path, first_seen, last_seen, entry_count, tool_use_count,
            total_input_tokens, total_output_tokens, primary_branch
        )
        SELECT
            e.session_id,
            MIN(e.project_path),
            MIN(e.timestamp),
            MAX(e.timestamp),
            COUNT(*),
            SUM(CASE WHEN e.entry_type = 'tool_use' THEN 1 ELSE 0 END),
            COALESCE(SUM(e.input_tokens), 0),
            COALESCE(SUM(e.output_tokens), 0),
            (
                SELECT b.git_branch FROM events b
                WHERE b.session_id = e.session_id AND b.git_branch IS NOT NULL AND b.git_branch != ''
                ORDER BY b.timestamp DESC, b.id DESC
                LIMIT 1
            )
        FROM events e
        GROUP BY e.session_id
        "#,
        [],
    )?;

    tx.commit()?;
    Ok(written)
}
