// SQLite event store
// Events are the source of truth; sessions and patterns are derived caches

mod convert;
mod db;
pub mod error;
mod queries;
mod records;
mod schema;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use records::{
    DbStats, EventFilter, RelatedBy, SessionCommitDetail, TokenGrouping, TokenUsageRow,
};
pub use schema::SCHEMA_VERSION;
