use rusqlite::Connection;

use crate::Result;
use crate::convert::opt_ts_column;
use crate::records::DbStats;
use crate::schema::read_version;

pub fn collect(conn: &Connection, db_path: Option<&std::path::Path>) -> Result<DbStats> {
    let (earliest_event, latest_event) = conn.query_row(
        "SELECT MIN(timestamp), MAX(timestamp) FROM events",
        [],
        |row| Ok((opt_ts_column(row, 0)?, opt_ts_column(row, 1)?)),
    )?;

    let db_size_bytes = match db_path {
        Some(path) if path.exists() => std::fs::metadata(path)?.len(),
        _ => 0,
    };

    Ok(DbStats {
        event_count: super::event::count(conn)?,
        session_count: super::session::count(conn)?,
        pattern_count: super::pattern::count(conn)?,
        files_processed: super::ingestion::count(conn)?,
        git_commit_count: super::git::count(conn)?,
        earliest_event,
        latest_event,
        db_size_bytes,
        db_path: db_path.map(|p| p.display().to_string()),
        schema_version: read_version(conn)?,
    })
}
