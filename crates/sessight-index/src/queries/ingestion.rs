use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};
use sessight_types::IngestionState;

use crate::Result;
use crate::convert::{opt_ts_column, ts_column, ts_to_sql};

pub fn get(conn: &Connection, file_path: &str) -> Result<Option<IngestionState>> {
    let state = conn
        .query_row(
            r#"
            SELECT file_path, file_size, last_modified, entries_processed, last_processed
            FROM ingestion_state
            WHERE file_path = ?1
            "#,
            [file_path],
            |row| {
                Ok(IngestionState {
                    file_path: row.get(0)?,
                    file_size: row.get(1)?,
                    last_modified: ts_column(row, 2)?,
                    entries_processed: row.get(3)?,
                    last_processed: ts_column(row, 4)?,
                })
            },
        )
        .optional()?;

    Ok(state)
}

pub fn upsert(conn: &Connection, state: &IngestionState) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO ingestion_state (file_path, file_size, last_modified, entries_processed, last_processed)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(file_path) DO UPDATE SET
            file_size = ?2,
            last_modified = ?3,
            entries_processed = ?4,
            last_processed = ?5
        "#,
        params![
            &state.file_path,
            state.file_size,
            ts_to_sql(&state.last_modified),
            state.entries_processed,
            ts_to_sql(&state.last_processed),
        ],
    )?;

    Ok(())
}

pub fn last_processed(conn: &Connection) -> Result<Option<NaiveDateTime>> {
    Ok(conn.query_row(
        "SELECT MAX(last_processed) FROM ingestion_state",
        [],
        |row| opt_ts_column(row, 0),
    )?)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM ingestion_state", [], |row| row.get(0))?)
}
