use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use sessight_types::{EntryType, Event};

use super::Filters;
use crate::Result;
use crate::convert::{ts_column, ts_to_sql};
use crate::records::EventFilter;

pub(crate) const EVENT_SELECT: &str = r#"
    SELECT e.id, e.uuid, e.session_id, e.timestamp, e.project_path, e.entry_type,
           e.tool_name, e.tool_input_json, e.tool_id, e.is_error,
           e.command, e.command_args, e.file_path, e.skill_name,
           e.input_tokens, e.output_tokens, e.cache_read_tokens, e.cache_creation_tokens,
           e.model, e.git_branch, e.cwd, e.user_message_text,
           e.parent_uuid, e.agent_id, e.is_sidechain, e.version
    FROM events e
"#;

const INSERT_EVENT: &str = r#"
    INSERT OR IGNORE INTO events (
        uuid, session_id, timestamp, project_path, entry_type,
        tool_name, tool_input_json, tool_id, is_error,
        command, command_args, file_path, skill_name,
        input_tokens, output_tokens, cache_read_tokens, cache_creation_tokens,
        model, git_branch, cwd, user_message_text,
        parent_uuid, agent_id, is_sidechain, version
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
        ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
    )
"#;

pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let entry_type: String = row.get(5)?;
    let entry_type = entry_type.parse::<EntryType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
    })?;

    Ok(Event {
        id: row.get(0)?,
        uuid: row.get(1)?,
        session_id: row.get(2)?,
        timestamp: ts_column(row, 3)?,
        project_path: row.get(4)?,
        entry_type,
        tool_name: row.get(6)?,
        tool_input_json: row.get(7)?,
        tool_id: row.get(8)?,
        is_error: row.get(9)?,
        command: row.get(10)?,
        command_args: row.get(11)?,
        file_path: row.get(12)?,
        skill_name: row.get(13)?,
        input_tokens: row.get(14)?,
        output_tokens: row.get(15)?,
        cache_read_tokens: row.get(16)?,
        cache_creation_tokens: row.get(17)?,
        model: row.get(18)?,
        git_branch: row.get(19)?,
        cwd: row.get(20)?,
        user_message_text: row.get(21)?,
        parent_uuid: row.get(22)?,
        agent_id: row.get(23)?,
        is_sidechain: row.get(24)?,
        version: row.get(25)?,
    })
}

fn insert_with(stmt: &mut rusqlite::Statement<'_>, event: &Event) -> rusqlite::Result<usize> {
    stmt.execute(params![
        &event.uuid,
        &event.session_id,
        ts_to_sql(&event.timestamp),
        &event.project_path,
        event.entry_type.as_str(),
        &event.tool_name,
        &event.tool_input_json,
        &event.tool_id,
        event.is_error,
        &event.command,
        &event.command_args,
        &event.file_path,
        &event.skill_name,
        event.input_tokens,
        event.output_tokens,
        event.cache_read_tokens,
        event.cache_creation_tokens,
        &event.model,
        &event.git_branch,
        &event.cwd,
        &event.user_message_text,
        &event.parent_uuid,
        &event.agent_id,
        event.is_sidechain,
        &event.version,
    ])
}

/// Insert one event; returns false when `(session_id, uuid)` already exists.
pub fn insert(conn: &Connection, event: &Event) -> Result<bool> {
    let mut stmt = conn.prepare_cached(INSERT_EVENT)?;
    Ok(insert_with(&mut stmt, event)? > 0)
}

/// Insert a batch in one transaction; returns the number of new rows.
pub fn insert_batch(conn: &Connection, events: &[Event]) -> Result<usize> {
    if events.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    let mut added = 0;
    {
        let mut stmt = tx.prepare_cached(INSERT_EVENT)?;
        for event in events {
            added += insert_with(&mut stmt, event)?;
        }
    }
    tx.commit()?;

    Ok(added)
}

pub fn list(conn: &Connection, filter: &EventFilter) -> Result<Vec<Event>> {
    let mut filters = Filters::default();
    filters.window("e.timestamp", filter.window.as_ref());
    if let Some(tool) = &filter.tool_name {
        filters.push("e.tool_name = ?", tool.clone());
    }
    filters.project("e.project_path", filter.project.as_deref());
    if let Some(session_id) = &filter.session_id {
        filters.push("e.session_id = ?", session_id.clone());
    }

    let limit_clause = filter
        .limit
        .map(|l| format!("LIMIT {}", l))
        .unwrap_or_default();
    let sql = format!(
        "{} {} ORDER BY e.timestamp, e.id {}",
        EVENT_SELECT,
        filters.where_sql(),
        limit_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(filters.params().as_slice(), event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

/// Events carrying message text at or after `since`, oldest first.
pub fn messages_since(
    conn: &Connection,
    since: &NaiveDateTime,
    session_id: Option<&str>,
    entry_types: &[EntryType],
    limit: usize,
) -> Result<Vec<Event>> {
    let mut filters = Filters::default();
    filters.push("e.timestamp >= ?", ts_to_sql(since));
    filters.push_raw("e.user_message_text IS NOT NULL");
    if let Some(session_id) = session_id {
        filters.push("e.session_id = ?", session_id.to_string());
    }
    if !entry_types.is_empty() {
        let placeholders = vec!["?"; entry_types.len()].join(", ");
        filters.push_raw(&format!("e.entry_type IN ({})", placeholders));
        for entry_type in entry_types {
            filters.bind(entry_type.as_str());
        }
    }
    filters.bind(limit as i64);

    let sql = format!(
        "{} {} ORDER BY e.timestamp, e.id LIMIT ?",
        EVENT_SELECT,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(filters.params().as_slice(), event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
}

pub fn delete(conn: &Connection, session_id: &str, uuid: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM events WHERE session_id = ?1 AND uuid = ?2",
        params![session_id, uuid],
    )?;
    Ok(deleted > 0)
}

pub fn prune_before(conn: &Connection, cutoff: &NaiveDateTime) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute(
        "DELETE FROM events WHERE timestamp < ?1",
        params![ts_to_sql(cutoff)],
    )?;
    tx.commit()?;
    Ok(deleted)
}
