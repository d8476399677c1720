pub mod activity;
pub mod git;
pub mod ingest;
pub mod insights;
pub mod patterns;
pub mod search;
pub mod sessions;
pub mod usage;

pub use activity::{
    AgentActivityReport, ErrorDetailsReport, FileActivityReport, McpUsageReport, ProjectSummary,
    ProjectsReport,
};
pub use git::{CorrelationReport, GitIngestReport, SessionCommitsReport};
pub use ingest::{IngestOptions, IngestReport};
pub use insights::{
    ClassifyReport, FailureOverview, FailureReport, InsightSummary, InsightsReport, OverlapReport,
    ReworkReport, TrendReport, TrendSummary,
};
pub use patterns::{PatternReport, SampleReport};
pub use search::{SearchHit, SearchReport};
pub use sessions::{
    MessagesReport, RelatedSessionsReport, SessionListReport, TimelineEvent, TimelineReport,
};
pub use usage::{StatusReport, TokenTotals, TokenUsageReport, ToolFrequencyReport};
