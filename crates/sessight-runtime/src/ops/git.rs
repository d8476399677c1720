use chrono::Duration;
use serde::Serialize;
use sessight_engine::attribute_commits;
use sessight_index::{Database, SessionCommitDetail};
use sessight_providers::{CommitSource, parse_git_log};
use sessight_types::TimeWindow;
use std::path::Path;
use tracing::{info, warn};

use crate::Result;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GitIngestReport {
    pub repo: String,
    pub days: u32,
    pub found: usize,
    pub parsed: usize,
    pub added: usize,
    pub skipped_malformed: usize,
    pub skipped_date_parse: usize,
    pub skipped_invalid_sha: usize,
    /// Why no history could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Load the last `days` days of commits from `repo` into the store.
///
/// Failures of the commit source end up in the report's `error`; only store
/// failures are returned as errors.
pub fn ingest_git(
    db: &Database,
    source: &dyn CommitSource,
    repo: &Path,
    days: u32,
    project: Option<&str>,
) -> Result<GitIngestReport> {
    let mut report = GitIngestReport {
        repo: repo.display().to_string(),
        days,
        ..GitIngestReport::default()
    };

    let output = match source.log(repo, days) {
        Ok(output) => output,
        Err(err) => {
            warn!(repo = %repo.display(), error = %err, "failed to read commit history");
            report.error = Some(err.to_string());
            return Ok(report);
        }
    };

    let parsed = parse_git_log(&output, project);
    report.found = parsed.found;
    report.parsed = parsed.commits.len();
    report.skipped_malformed = parsed.skipped_malformed;
    report.skipped_date_parse = parsed.skipped_date_parse;
    report.skipped_invalid_sha = parsed.skipped_invalid_sha;
    report.added = db.add_git_commits(&parsed.commits)?;

    info!(
        repo = %repo.display(),
        found = report.found,
        added = report.added,
        "git history ingested"
    );
    Ok(report)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationReport {
    pub days: u32,
    pub sessions_analyzed: usize,
    pub commits_checked: usize,
    pub commits_correlated: usize,
    pub links_written: usize,
    /// Rows in batches that failed to write
    pub errors: usize,
}

/// Attribute unattributed commits of the window to sessions and record the
/// links.
///
/// The two writes are independent transactions; a failure of one is logged
/// and counted, and the other still runs.
pub fn correlate(db: &Database, days: u32, buffer_minutes: i64) -> Result<CorrelationReport> {
    let window = TimeWindow::last_days(days);
    let spans = db.session_spans(&window, None)?;
    let commits = db.uncorrelated_commits(&window.start)?;

    let attribution = attribute_commits(&spans, &commits, Duration::minutes(buffer_minutes));

    let mut report = CorrelationReport {
        days,
        sessions_analyzed: spans.len(),
        commits_checked: commits.len(),
        ..CorrelationReport::default()
    };

    match db.assign_commit_sessions(&attribution.assignments) {
        Ok(updated) => report.commits_correlated = updated,
        Err(err) => {
            warn!(
                operation = "assign_commit_sessions",
                batch = attribution.assignments.len(),
                error = %err,
                "batch write failed"
            );
            report.errors += attribution.assignments.len();
        }
    }

    match db.add_session_commits(&attribution.links) {
        Ok(written) => report.links_written = written,
        Err(err) => {
            warn!(
                operation = "add_session_commits",
                batch = attribution.links.len(),
                error = %err,
                "batch write failed"
            );
            report.errors += attribution.links.len();
        }
    }

    info!(
        sessions = report.sessions_analyzed,
        commits = report.commits_checked,
        correlated = report.commits_correlated,
        "correlation finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCommitsReport {
    pub session_id: String,
    pub commit_count: usize,
    pub commits: Vec<SessionCommitDetail>,
}

pub fn session_commits(db: &Database, session_id: &str) -> Result<SessionCommitsReport> {
    let commits = db.get_session_commits(session_id)?;
    Ok(SessionCommitsReport {
        session_id: session_id.to_string(),
        commit_count: commits.len(),
        commits,
    })
}
