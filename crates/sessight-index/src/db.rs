use chrono::NaiveDateTime;
use rusqlite::Connection;
use sessight_types::{
    AgentActivity, AgentToolCount, EntryType, ErrorDetail, Event, FileActivity, FileEdit,
    GitCommit, IngestionState, Pattern, PatternType, PeriodMetrics, ProjectActivity,
    RelatedSession, Session, SessionActivity, SessionCommit, SessionSpan, TimeWindow, ToolStep,
    UsageCount,
};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::queries;
use crate::records::{
    DbStats, EventFilter, RelatedBy, SessionCommitDetail, TokenGrouping, TokenUsageRow,
};
use crate::schema;

// NOTE: Store layout
//
// events          - one row per parsed log entry, unique on (session_id, uuid)
// events_fts      - FTS5 index over events.user_message_text, trigger-synced
// sessions        - rollup rebuilt from events after each ingestion run
// ingestion_state - per-file (size, mtime) fingerprint
// patterns        - analytic cache, replaced per type on refresh
// git_commits     - commit history; session_id set by correlation
// session_commits - session/commit attribution links

/// Handle to the sessight store.
///
/// Owns a single connection; callers serialize access.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the store at `db_path`, migrating it if needed.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(db_path)?;
        schema::init_schema(&mut conn)?;

        Ok(Self {
            conn,
            path: Some(db_path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::init_schema(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // Events

    /// Returns false when the event was already stored.
    pub fn add_event(&self, event: &Event) -> Result<bool> {
        queries::event::insert(&self.conn, event)
    }

    /// Returns the number of events that were new.
    pub fn add_events(&self, events: &[Event]) -> Result<usize> {
        queries::event::insert_batch(&self.conn, events)
    }

    pub fn get_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        queries::event::list(&self.conn, filter)
    }

    /// Events with message text, oldest first; empty `entry_types` means all.
    pub fn messages_since(
        &self,
        since: &NaiveDateTime,
        session_id: Option<&str>,
        entry_types: &[EntryType],
        limit: usize,
    ) -> Result<Vec<Event>> {
        queries::event::messages_since(&self.conn, since, session_id, entry_types, limit)
    }

    pub fn event_count(&self) -> Result<i64> {
        queries::event::count(&self.conn)
    }

    pub fn delete_event(&self, session_id: &str, uuid: &str) -> Result<bool> {
        queries::event::delete(&self.conn, session_id, uuid)
    }

    pub fn prune_events_before(&self, cutoff: &NaiveDateTime) -> Result<usize> {
        queries::event::prune_before(&self.conn, cutoff)
    }

    pub fn search_messages(
        &self,
        query: &str,
        limit: usize,
        project: Option<&str>,
        entry_types: &[EntryType],
    ) -> Result<Vec<Event>> {
        queries::search::messages(&self.conn, query, limit, project, entry_types)
    }

    // Sessions

    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        queries::session::upsert(&self.conn, session)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        queries::session::get_by_id(&self.conn, session_id)
    }

    pub fn list_sessions(&self, project: Option<&str>, limit: Option<usize>) -> Result<Vec<Session>> {
        queries::session::list(&self.conn, project, limit)
    }

    pub fn sessions_active_since(
        &self,
        since: &NaiveDateTime,
        project: Option<&str>,
    ) -> Result<Vec<Session>> {
        queries::session::list_active_since(&self.conn, since, project)
    }

    pub fn session_count(&self) -> Result<i64> {
        queries::session::count(&self.conn)
    }

    /// Rebuild all session rows from events; returns how many were written.
    pub fn recompute_sessions(&self) -> Result<usize> {
        queries::session::recompute_all(&self.conn)
    }

    // Ingestion state

    pub fn get_ingestion_state(&self, file_path: &str) -> Result<Option<IngestionState>> {
        queries::ingestion::get(&self.conn, file_path)
    }

    pub fn update_ingestion_state(&self, state: &IngestionState) -> Result<()> {
        queries::ingestion::upsert(&self.conn, state)
    }

    pub fn last_ingestion_time(&self) -> Result<Option<NaiveDateTime>> {
        queries::ingestion::last_processed(&self.conn)
    }

    // Patterns

    pub fn upsert_pattern(&self, pattern: &Pattern) -> Result<()> {
        queries::pattern::upsert(&self.conn, pattern)
    }

    pub fn replace_patterns(&self, types: &[PatternType], patterns: &[Pattern]) -> Result<usize> {
        queries::pattern::replace(&self.conn, types, patterns)
    }

    pub fn get_patterns(&self, pattern_type: Option<PatternType>) -> Result<Vec<Pattern>> {
        queries::pattern::list(&self.conn, pattern_type)
    }

    pub fn clear_patterns(&self, pattern_type: Option<PatternType>) -> Result<usize> {
        queries::pattern::clear(&self.conn, pattern_type)
    }

    // Git

    pub fn add_git_commit(&self, commit: &GitCommit) -> Result<()> {
        queries::git::upsert(&self.conn, commit)
    }

    pub fn add_git_commits(&self, commits: &[GitCommit]) -> Result<usize> {
        queries::git::upsert_batch(&self.conn, commits)
    }

    pub fn get_git_commits(
        &self,
        window: Option<&TimeWindow>,
        project: Option<&str>,
    ) -> Result<Vec<GitCommit>> {
        queries::git::list(&self.conn, window, project)
    }

    pub fn uncorrelated_commits(&self, since: &NaiveDateTime) -> Result<Vec<GitCommit>> {
        queries::git::uncorrelated_since(&self.conn, since)
    }

    /// Apply `(sha, session_id)` assignments in one transaction.
    pub fn assign_commit_sessions(&self, assignments: &[(String, String)]) -> Result<usize> {
        queries::git::assign_sessions(&self.conn, assignments)
    }

    pub fn add_session_commits(&self, links: &[SessionCommit]) -> Result<usize> {
        queries::git::upsert_links(&self.conn, links)
    }

    pub fn get_session_commits(&self, session_id: &str) -> Result<Vec<SessionCommitDetail>> {
        queries::git::links_for_session(&self.conn, session_id)
    }

    // Analytics reads

    pub fn tool_counts(&self, window: &TimeWindow, project: Option<&str>) -> Result<Vec<UsageCount>> {
        queries::analytics::tool_counts(&self.conn, window, project)
    }

    pub fn command_counts(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<UsageCount>> {
        queries::analytics::command_counts(&self.conn, window, project)
    }

    pub fn slash_command_counts(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<UsageCount>> {
        queries::analytics::slash_command_counts(&self.conn, window, project)
    }

    pub fn tool_steps(&self, window: &TimeWindow, project: Option<&str>) -> Result<Vec<ToolStep>> {
        queries::analytics::tool_steps(&self.conn, window, project)
    }

    pub fn session_spans(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<SessionSpan>> {
        queries::analytics::session_spans(&self.conn, window, project)
    }

    pub fn session_activity(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
        min_events: i64,
    ) -> Result<Vec<SessionActivity>> {
        queries::analytics::session_activity(&self.conn, window, project, min_events)
    }

    pub fn period_metrics(&self, window: &TimeWindow) -> Result<PeriodMetrics> {
        queries::analytics::period_metrics(&self.conn, window)
    }

    pub fn errors_by_session(&self, window: &TimeWindow) -> Result<Vec<UsageCount>> {
        queries::analytics::errors_by_session(&self.conn, window)
    }

    pub fn errors_by_tool(&self, window: &TimeWindow) -> Result<Vec<UsageCount>> {
        queries::analytics::errors_by_tool(&self.conn, window)
    }

    pub fn file_edits(&self, window: &TimeWindow) -> Result<Vec<FileEdit>> {
        queries::analytics::file_edits(&self.conn, window)
    }

    pub fn token_usage(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
        grouping: TokenGrouping,
    ) -> Result<Vec<TokenUsageRow>> {
        queries::analytics::token_usage(&self.conn, window, project, grouping)
    }

    // Breakdowns

    pub fn file_activity(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<FileActivity>> {
        queries::activity::file_activity(&self.conn, window, project)
    }

    pub fn project_activity(&self, window: &TimeWindow) -> Result<Vec<ProjectActivity>> {
        queries::activity::project_activity(&self.conn, window)
    }

    pub fn agent_activity(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<AgentActivity>> {
        queries::activity::agent_activity(&self.conn, window, project)
    }

    pub fn agent_tool_counts(
        &self,
        window: &TimeWindow,
        project: Option<&str>,
    ) -> Result<Vec<AgentToolCount>> {
        queries::activity::agent_tool_counts(&self.conn, window, project)
    }

    pub fn error_details(&self, window: &TimeWindow, tool: Option<&str>) -> Result<Vec<ErrorDetail>> {
        queries::activity::error_details(&self.conn, window, tool)
    }

    /// Sessions related to `session_id`. The window bounds file and command
    /// relations only; temporal neighbours are found around the session itself.
    pub fn related_sessions(
        &self,
        session_id: &str,
        by: RelatedBy,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<RelatedSession>> {
        queries::activity::related_sessions(&self.conn, session_id, by, window, limit)
    }

    pub fn stats(&self) -> Result<DbStats> {
        queries::stats::collect(&self.conn, self.path.as_deref())
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
