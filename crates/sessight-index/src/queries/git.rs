use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Statement, params};
use sessight_types::{GitCommit, SessionCommit, TimeWindow};
use std::collections::BTreeSet;

use super::Filters;
use crate::Result;
use crate::convert::{opt_ts_column, opt_ts_to_sql, ts_to_sql};
use crate::records::SessionCommitDetail;

// A re-ingested commit overwrites its details but keeps an existing attribution.
const UPSERT_COMMIT: &str = r#"
    INSERT INTO git_commits (sha, timestamp, author, message, project_path, session_id)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(sha) DO UPDATE SET
        timestamp = excluded.timestamp,
        author = excluded.author,
        message = excluded.message,
        project_path = excluded.project_path,
        session_id = COALESCE(excluded.session_id, git_commits.session_id)
"#;

const COMMIT_COLUMNS: &str = "sha, timestamp, author, message, project_path, session_id";

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<GitCommit> {
    let sha: String = row.get(0)?;
    let commit = GitCommit::new(sha)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(commit
        .with_timestamp(opt_ts_column(row, 1)?)
        .with_author(row.get(2)?)
        .with_message(row.get(3)?)
        .with_project(row.get(4)?)
        .with_session(row.get(5)?))
}

fn upsert_with(stmt: &mut Statement<'_>, commit: &GitCommit) -> rusqlite::Result<usize> {
    stmt.execute(params![
        commit.sha(),
        opt_ts_to_sql(commit.timestamp().as_ref()),
        commit.author(),
        commit.message(),
        commit.project_path(),
        commit.session_id(),
    ])
}

pub fn upsert(conn: &Connection, commit: &GitCommit) -> Result<()> {
    let mut stmt = conn.prepare_cached(UPSERT_COMMIT)?;
    upsert_with(&mut stmt, commit)?;
    Ok(())
}

pub fn upsert_batch(conn: &Connection, commits: &[GitCommit]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(UPSERT_COMMIT)?;
        for commit in commits {
            upsert_with(&mut stmt, commit)?;
        }
    }
    tx.commit()?;
    Ok(commits.len())
}

pub fn list(
    conn: &Connection,
    window: Option<&TimeWindow>,
    project: Option<&str>,
) -> Result<Vec<GitCommit>> {
    let mut filters = Filters::default();
    filters.window("timestamp", window);
    filters.project("project_path", project);

    let sql = format!(
        "SELECT {} FROM git_commits {} ORDER BY timestamp DESC, sha",
        COMMIT_COLUMNS,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let commits = stmt
        .query_map(filters.params().as_slice(), commit_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(commits)
}

/// Commits with a timestamp at or after `since` that no session claims yet.
pub fn uncorrelated_since(conn: &Connection, since: &NaiveDateTime) -> Result<Vec<GitCommit>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM git_commits
        WHERE session_id IS NULL AND timestamp IS NOT NULL AND timestamp >= ?1
        ORDER BY timestamp, sha
        "#,
        COMMIT_COLUMNS
    ))?;

    let commits = stmt
        .query_map([ts_to_sql(since)], commit_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(commits)
}

/// Set `session_id` for each `(sha, session_id)` pair in one transaction.
pub fn assign_sessions(conn: &Connection, assignments: &[(String, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut updated = 0;
    {
        let mut stmt = tx.prepare_cached("UPDATE git_commits SET session_id = ?2 WHERE sha = ?1")?;
        for (sha, session_id) in assignments {
            updated += stmt.execute(params![sha, session_id])?;
        }
    }
    tx.commit()?;
    Ok(updated)
}

// Exactly one link per session is first: its earliest commit, ties broken by sha.
const REFRESH_FIRST_COMMIT: &str = r#"
    UPDATE session_commits
    SET is_first_commit = (commit_sha = (
        SELECT sc.commit_sha
        FROM session_commits sc
        LEFT JOIN git_commits g ON g.sha = sc.commit_sha
        WHERE sc.session_id = ?1
        ORDER BY g.timestamp IS NULL, g.timestamp, sc.commit_sha
        LIMIT 1
    ))
    WHERE session_id = ?1
"#;

/// Write links and recompute `is_first_commit` over every stored link of the
/// touched sessions, not only the new ones.
pub fn upsert_links(conn: &Connection, links: &[SessionCommit]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            r#"
            INSERT OR REPLACE INTO session_commits
                (session_id, commit_sha, time_to_commit_seconds, is_first_commit)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;
        for link in links {
            stmt.execute(params![
                &link.session_id,
                &link.commit_sha,
                link.time_to_commit_seconds,
                link.is_first_commit,
            ])?;
        }

        let sessions: BTreeSet<&str> = links.iter().map(|l| l.session_id.as_str()).collect();
        let mut refresh = tx.prepare_cached(REFRESH_FIRST_COMMIT)?;
        for session_id in sessions {
            refresh.execute([session_id])?;
        }
    }
    tx.commit()?;
    Ok(links.len())
}

pub fn links_for_session(conn: &Connection, session_id: &str) -> Result<Vec<SessionCommitDetail>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT g.sha, g.timestamp, g.author, g.message, sc.time_to_commit_seconds, sc.is_first_commit
        FROM session_commits sc
        JOIN git_commits g ON g.sha = sc.commit_sha
        WHERE sc.session_id = ?1
        ORDER BY g.timestamp, g.sha
        "#,
    )?;

    let links = stmt
        .query_map([session_id], |row| {
            Ok(SessionCommitDetail {
                sha: row.get(0)?,
                timestamp: opt_ts_column(row, 1)?,
                author: row.get(2)?,
                message: row.get(3)?,
                time_to_commit_seconds: row.get(4)?,
                is_first_commit: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(links)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM git_commits", [], |row| row.get(0))?)
}
