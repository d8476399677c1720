use rusqlite::Connection;
use sessight_types::{EntryType, Event};

use super::Filters;
use super::event::EVENT_SELECT;
use crate::convert::contains_pattern;
use crate::{Error, Result};

/// Full-text search over message text, best match first.
///
/// A malformed FTS5 expression yields [`Error::InvalidQuery`] rather than a
/// database error, so callers can tell it apart from an empty result.
pub fn messages(
    conn: &Connection,
    query: &str,
    limit: usize,
    project: Option<&str>,
    entry_types: &[EntryType],
) -> Result<Vec<Event>> {
    if query.trim().is_empty() {
        return Err(Error::InvalidQuery("query is empty".to_string()));
    }

    let mut filters = Filters::default();
    filters.push("events_fts MATCH ?", query.to_string());
    if let Some(project) = project {
        filters.push("e.project_path LIKE ?", contains_pattern(project));
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
        "{} JOIN events_fts ON events_fts.rowid = e.id {} ORDER BY bm25(events_fts), e.timestamp DESC LIMIT ?",
        EVENT_SELECT,
        filters.where_sql()
    );

    let run = || -> rusqlite::Result<Vec<Event>> {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(filters.params().as_slice(), super::event::event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    };

    run().map_err(classify_error)
}

fn classify_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &err
        && is_syntax_error(msg)
    {
        return Error::InvalidQuery(msg.clone());
    }
    Error::Database(err)
}

fn is_syntax_error(msg: &str) -> bool {
    msg.starts_with("fts5:")
        || msg.contains("syntax error")
        || msg.contains("unterminated string")
        || msg.starts_with("no such column")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_messages_are_classified() {
        assert!(is_syntax_error("fts5: syntax error near \"AND\""));
        assert!(is_syntax_error("unterminated string"));
        assert!(is_syntax_error("no such column: foo"));
        assert!(!is_syntax_error("database is locked"));
    }
}
