pub mod activity;
pub mod error;
pub mod event;
pub mod git;
pub mod pattern;
pub mod session;
pub mod window;

pub use activity::{
    AgentActivity, AgentToolCount, ErrorDetail, FileActivity, FileEdit, PeriodMetrics,
    ProjectActivity, RelatedSession, SessionActivity, SessionSpan, ToolStep, UsageCount,
};
pub use error::{Error, Result};
pub use event::{EntryType, Event};
pub use git::{GitCommit, SessionCommit};
pub use pattern::{Pattern, PatternType};
pub use session::{IngestionState, Session};
pub use window::{TimeWindow, utc_now};
