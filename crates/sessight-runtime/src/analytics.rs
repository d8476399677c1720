use sessight_engine::CompareMode;
use sessight_index::{Database, EventFilter, RelatedBy, TokenGrouping};
use sessight_providers::{CommitSource, GitCli, load_allowed_commands};
use sessight_types::EntryType;
use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::ops::{
    AgentActivityReport, ClassifyReport, CorrelationReport, ErrorDetailsReport,
    FailureReport, FileActivityReport, GitIngestReport, IngestOptions, IngestReport,
    InsightsReport, McpUsageReport, MessagesReport, OverlapReport, PatternReport, ProjectsReport,
    RelatedSessionsReport, SampleReport, SearchReport, SessionCommitsReport, SessionListReport,
    StatusReport, TimelineReport, TokenUsageReport, ToolFrequencyReport, TrendReport, activity,
    git, ingest, insights, patterns, search, sessions, usage,
};
use crate::{Error, Result};

/// Entry point to the session store and every analytics operation.
///
/// Window arguments are in days ending now. Operations read whatever is
/// stored; call [`Analytics::ensure_fresh`] or [`Analytics::ingest`] first to
/// pick up new logs.
pub struct Analytics {
    db: Database,
    config: Config,
}

impl Analytics {
    /// Open the store in `data_dir`, reading `config.toml` from it when
    /// present.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = Config::load_from(&data_dir.join("config.toml"))?;
        Self::with_config(data_dir, config)
    }

    pub fn with_config(data_dir: &Path, config: Config) -> Result<Self> {
        let db = Database::open(&config.db_path(data_dir))?;
        Ok(Self { db, config })
    }

    /// A store that lives only as long as this value.
    pub fn in_memory(config: Config) -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn ingest_options(&self, days: u32, project: Option<&str>, force: bool) -> Result<IngestOptions> {
        Ok(IngestOptions {
            logs_dir: self.config.logs_dir()?,
            days,
            project: project.map(str::to_string),
            force,
        })
    }

    fn allowed_commands(&self) -> HashSet<String> {
        self.config
            .settings_path()
            .map(|path| load_allowed_commands(&path))
            .unwrap_or_default()
    }

    pub fn ingest(&self, days: u32, project: Option<&str>, force: bool) -> Result<IngestReport> {
        ingest::ingest_logs(&self.db, &self.ingest_options(days, project, force)?)
    }

    /// Ingest when the last run is older than the configured freshness limit.
    pub fn ensure_fresh(&self, days: u32) -> Result<Option<IngestReport>> {
        ingest::ensure_fresh(
            &self.db,
            &self.ingest_options(days, None, false)?,
            self.config.analysis.freshness_minutes,
        )
    }

    /// Load commit history of `repo` with the configured `git` binary.
    pub fn ingest_git(
        &self,
        repo: &Path,
        days: u32,
        project: Option<&str>,
    ) -> Result<GitIngestReport> {
        let git = GitCli::new(self.config.git.binary.clone(), self.config.git.timeout());
        self.ingest_git_from(&git, repo, days, project)
    }

    pub fn ingest_git_from(
        &self,
        source: &dyn CommitSource,
        repo: &Path,
        days: u32,
        project: Option<&str>,
    ) -> Result<GitIngestReport> {
        git::ingest_git(&self.db, source, repo, days, project)
    }

    pub fn correlate(&self, days: u32) -> Result<CorrelationReport> {
        git::correlate(&self.db, days, self.config.analysis.commit_buffer_minutes)
    }

    pub fn session_commits(&self, session_id: &str) -> Result<SessionCommitsReport> {
        git::session_commits(&self.db, session_id)
    }

    pub fn compute_patterns(&self, days: u32) -> Result<PatternReport> {
        patterns::compute_patterns(
            &self.db,
            days,
            &self.config.analysis,
            &self.allowed_commands(),
        )
    }

    /// Random occurrences of a tool sequence such as `"Read → Edit"`.
    pub fn sample(
        &self,
        sequence: &str,
        count: usize,
        context: usize,
        days: u32,
    ) -> Result<SampleReport> {
        patterns::sample_sequences(
            &self.db,
            sequence,
            count,
            context,
            days,
            &mut rand::thread_rng(),
        )
    }

    pub fn classify(&self, days: u32, project: Option<&str>) -> Result<ClassifyReport> {
        insights::classify_sessions(
            &self.db,
            days,
            project,
            self.config.analysis.min_session_events,
        )
    }

    pub fn detect_overlaps(&self, days: u32, min_overlap_minutes: i64) -> Result<OverlapReport> {
        if min_overlap_minutes < 0 {
            return Err(Error::InvalidInput(
                "min_overlap_minutes must not be negative".to_string(),
            ));
        }
        insights::find_overlaps(&self.db, days, min_overlap_minutes)
    }

    pub fn trend(&self, days: u32, mode: CompareMode) -> Result<TrendReport> {
        insights::analyze_trends(&self.db, days, mode)
    }

    pub fn analyze_failures(&self, days: u32) -> Result<FailureReport> {
        insights::analyze_failures(&self.db, days, self.config.analysis.rework_window_minutes)
    }

    pub fn insights(&self, days: u32, refresh: bool) -> Result<InsightsReport> {
        insights::get_insights(
            &self.db,
            days,
            refresh,
            &self.config.analysis,
            &self.allowed_commands(),
        )
    }

    pub fn search(
        &self,
        query: &str,
        limit: usize,
        project: Option<&str>,
        entry_types: &[EntryType],
    ) -> Result<SearchReport> {
        search::search_messages(&self.db, query, limit, project, entry_types)
    }

    pub fn tool_frequency(&self, days: u32, project: Option<&str>) -> Result<ToolFrequencyReport> {
        usage::tool_frequency(&self.db, days, project)
    }

    pub fn token_usage(
        &self,
        days: u32,
        project: Option<&str>,
        group_by: TokenGrouping,
    ) -> Result<TokenUsageReport> {
        usage::token_usage(&self.db, days, project, group_by)
    }

    pub fn status(&self) -> Result<StatusReport> {
        usage::status(&self.db)
    }

    pub fn list_sessions(&self, days: u32, project: Option<&str>) -> Result<SessionListReport> {
        sessions::list_sessions(&self.db, days, project)
    }

    pub fn session_events(&self, filter: EventFilter) -> Result<TimelineReport> {
        sessions::session_events(&self.db, filter)
    }

    pub fn session_messages(
        &self,
        hours: u32,
        session_id: Option<&str>,
        entry_types: &[EntryType],
        limit: usize,
        max_chars: usize,
    ) -> Result<MessagesReport> {
        sessions::session_messages(&self.db, hours, session_id, entry_types, limit, max_chars)
    }

    pub fn related_sessions(
        &self,
        session_id: &str,
        by: RelatedBy,
        days: u32,
        limit: usize,
    ) -> Result<RelatedSessionsReport> {
        sessions::related_sessions(&self.db, session_id, by, days, limit)
    }

    pub fn file_activity(
        &self,
        days: u32,
        project: Option<&str>,
        limit: usize,
        collapse_worktrees: bool,
    ) -> Result<FileActivityReport> {
        activity::file_activity(&self.db, days, project, limit, collapse_worktrees)
    }

    pub fn projects(&self, days: u32) -> Result<ProjectsReport> {
        activity::projects(&self.db, days)
    }

    pub fn mcp_usage(&self, days: u32, project: Option<&str>) -> Result<McpUsageReport> {
        activity::mcp_usage(&self.db, days, project)
    }

    pub fn agent_activity(&self, days: u32, project: Option<&str>) -> Result<AgentActivityReport> {
        activity::agent_activity(&self.db, days, project)
    }

    pub fn error_details(
        &self,
        days: u32,
        tool: Option<&str>,
        limit: usize,
    ) -> Result<ErrorDetailsReport> {
        activity::error_details(&self.db, days, tool, limit)
    }
}

/// Open the default data directory: `SESSIGHT_PATH`, the XDG data dir, or
/// `~/.sessight`.
pub fn open_default() -> Result<Analytics> {
    let data_dir = crate::config::resolve_data_dir(None)?;
    Analytics::open(&data_dir)
}
