use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{Error, Result};

// Schema version (increment together with a new MIGRATIONS entry)
pub const SCHEMA_VERSION: i32 = 4;

type MigrationFn = fn(&Connection) -> rusqlite::Result<()>;

// Ordered upgrade steps. Every step must be safe to re-apply.
const MIGRATIONS: &[(i32, MigrationFn)] = &[
    (1, create_base_tables),
    (2, add_message_search),
    (3, add_git_tables),
    (4, add_agent_columns),
];

// Events as first released; later columns arrive through migrations 2 and 4.
const EVENTS_TABLE_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        uuid TEXT NOT NULL,
        session_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        project_path TEXT NOT NULL,
        entry_type TEXT NOT NULL,
        tool_name TEXT,
        tool_input_json TEXT,
        tool_id TEXT,
        is_error INTEGER NOT NULL DEFAULT 0,
        command TEXT,
        command_args TEXT,
        file_path TEXT,
        skill_name TEXT,
        input_tokens INTEGER,
        output_tokens INTEGER,
        cache_read_tokens INTEGER,
        cache_creation_tokens INTEGER,
        model TEXT,
        git_branch TEXT,
        cwd TEXT,
        UNIQUE(session_id, uuid)
    );
"#;

const EVENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        uuid TEXT NOT NULL,
        session_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        project_path TEXT NOT NULL,
        entry_type TEXT NOT NULL,
        tool_name TEXT,
        tool_input_json TEXT,
        tool_id TEXT,
        is_error INTEGER NOT NULL DEFAULT 0,
        command TEXT,
        command_args TEXT,
        file_path TEXT,
        skill_name TEXT,
        input_tokens INTEGER,
        output_tokens INTEGER,
        cache_read_tokens INTEGER,
        cache_creation_tokens INTEGER,
        model TEXT,
        git_branch TEXT,
        cwd TEXT,
        user_message_text TEXT,
        parent_uuid TEXT,
        agent_id TEXT,
        is_sidechain INTEGER NOT NULL DEFAULT 0,
        version TEXT,
        UNIQUE(session_id, uuid)
    );
"#;

const SUPPORT_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        project_path TEXT,
        first_seen TEXT,
        last_seen TEXT,
        entry_count INTEGER NOT NULL DEFAULT 0,
        tool_use_count INTEGER NOT NULL DEFAULT 0,
        total_input_tokens INTEGER NOT NULL DEFAULT 0,
        total_output_tokens INTEGER NOT NULL DEFAULT 0,
        primary_branch TEXT
    );

    CREATE TABLE IF NOT EXISTS ingestion_state (
        file_path TEXT PRIMARY KEY,
        file_size INTEGER NOT NULL,
        last_modified TEXT NOT NULL,
        entries_processed INTEGER NOT NULL DEFAULT 0,
        last_processed TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS patterns (
        id INTEGER PRIMARY KEY,
        pattern_type TEXT NOT NULL,
        pattern_key TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen TEXT,
        metadata_json TEXT,
        computed_at TEXT NOT NULL,
        UNIQUE(pattern_type, pattern_key)
    );

    CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id, timestamp);
    CREATE INDEX IF NOT EXISTS idx_events_tool ON events(tool_name);
    CREATE INDEX IF NOT EXISTS idx_events_project ON events(project_path);
    CREATE INDEX IF NOT EXISTS idx_events_entry_type ON events(entry_type);
    CREATE INDEX IF NOT EXISTS idx_sessions_last_seen ON sessions(last_seen DESC);
    CREATE INDEX IF NOT EXISTS idx_patterns_type ON patterns(pattern_type);
"#;

// External-content FTS5 index kept in sync by triggers; the update trigger
// only fires when the indexed column changes.
const MESSAGE_SEARCH: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS events_fts USING fts5(
        user_message_text,
        content='events',
        content_rowid='id'
    );

    CREATE TRIGGER IF NOT EXISTS events_fts_insert AFTER INSERT ON events BEGIN
        INSERT INTO events_fts(rowid, user_message_text)
        VALUES (new.id, new.user_message_text);
    END;

    CREATE TRIGGER IF NOT EXISTS events_fts_delete AFTER DELETE ON events BEGIN
        INSERT INTO events_fts(events_fts, rowid, user_message_text)
        VALUES ('delete', old.id, old.user_message_text);
    END;

    CREATE TRIGGER IF NOT EXISTS events_fts_update AFTER UPDATE OF user_message_text ON events BEGIN
        INSERT INTO events_fts(events_fts, rowid, user_message_text)
        VALUES ('delete', old.id, old.user_message_text);
        INSERT INTO events_fts(rowid, user_message_text)
        VALUES (new.id, new.user_message_text);
    END;
"#;

const GIT_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS git_commits (
        sha TEXT PRIMARY KEY,
        timestamp TEXT,
        author TEXT,
        message TEXT,
        project_path TEXT,
        session_id TEXT
    );

    CREATE TABLE IF NOT EXISTS session_commits (
        session_id TEXT NOT NULL,
        commit_sha TEXT NOT NULL,
        time_to_commit_seconds INTEGER NOT NULL DEFAULT 0,
        is_first_commit INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (session_id, commit_sha)
    );

    CREATE INDEX IF NOT EXISTS idx_git_commits_timestamp ON git_commits(timestamp);
    CREATE INDEX IF NOT EXISTS idx_git_commits_session ON git_commits(session_id);
    CREATE INDEX IF NOT EXISTS idx_session_commits_sha ON session_commits(commit_sha);
"#;

const AGENT_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_events_parent_uuid ON events(parent_uuid);
    CREATE INDEX IF NOT EXISTS idx_events_agent ON events(agent_id);
"#;

/// Bring the store to [`SCHEMA_VERSION`].
///
/// An empty store is created at the current schema directly. A store with an
/// older version runs the pending migration steps in order. Either path runs
/// in a single transaction, so a failing step leaves the store untouched.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    let current = read_version(conn)?;

    if current > SCHEMA_VERSION {
        return Err(Error::UnsupportedVersion {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;

    if current == 0 && !has_user_tables(&tx)? {
        debug!(version = SCHEMA_VERSION, "creating fresh schema");
        create_current_schema(&tx)?;
    } else {
        for (version, step) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            step(&tx).map_err(|source| Error::Migration {
                version: *version,
                source,
            })?;
            debug!(version, "applied schema migration");
        }
        info!(from = current, to = SCHEMA_VERSION, "migrated store schema");
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(())
}

pub(crate) fn read_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn create_current_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(EVENTS_TABLE)?;
    conn.execute_batch(SUPPORT_TABLES)?;
    conn.execute_batch(MESSAGE_SEARCH)?;
    conn.execute_batch(GIT_TABLES)?;
    conn.execute_batch(AGENT_INDEXES)?;
    Ok(())
}

fn create_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(EVENTS_TABLE_V1)?;
    conn.execute_batch(SUPPORT_TABLES)
}

fn add_message_search(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "events", "user_message_text", "TEXT")?;
    conn.execute_batch(MESSAGE_SEARCH)?;
    // Index rows written before the triggers existed
    conn.execute("INSERT INTO events_fts(events_fts) VALUES ('rebuild')", [])?;
    Ok(())
}

fn add_git_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(GIT_TABLES)
}

fn add_agent_columns(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "events", "parent_uuid", "TEXT")?;
    add_column_if_missing(conn, "events", "agent_id", "TEXT")?;
    add_column_if_missing(conn, "events", "is_sidechain", "INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(conn, "events", "version", "TEXT")?;
    conn.execute_batch(AGENT_INDEXES)
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> rusqlite::Result<()> {
    if column_exists(conn, table, column)? {
        return Ok(());
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column, definition
    ))
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_versions_are_strictly_increasing() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.last().copied(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_every_step_is_reapplicable() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();

        for (_, step) in MIGRATIONS {
            step(&conn).unwrap();
        }
        assert!(column_exists(&conn, "events", "agent_id").unwrap());
    }

    #[test]
    fn test_fresh_store_is_stamped_with_target_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);

        // Second open is a no-op
        init_schema(&mut conn).unwrap();
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_store_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        let err = init_schema(&mut conn).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }
}
