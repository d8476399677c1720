use chrono::NaiveDateTime;
use serde::Serialize;
use sessight_index::Database;
use sessight_types::{EntryType, Event};

use crate::{Error, Result};

/// Upper bound on search results per query
pub const MAX_SEARCH_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub session_id: String,
    pub uuid: String,
    pub project: String,
    pub timestamp: NaiveDateTime,
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<String>,
    pub text: String,
}

impl From<Event> for SearchHit {
    fn from(event: Event) -> Self {
        Self {
            session_id: event.session_id,
            uuid: event.uuid,
            project: event.project_path,
            timestamp: event.timestamp,
            entry_type: event.entry_type,
            skill_name: event.skill_name,
            text: event.user_message_text.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Full-text search over user messages, command expansions and summaries,
/// best match first.
pub fn search_messages(
    db: &Database,
    query: &str,
    limit: usize,
    project: Option<&str>,
    entry_types: &[EntryType],
) -> Result<SearchReport> {
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".to_string()));
    }
    let limit = limit.min(MAX_SEARCH_LIMIT);

    let results: Vec<SearchHit> = db
        .search_messages(query, limit, project, entry_types)?
        .into_iter()
        .map(SearchHit::from)
        .collect();

    Ok(SearchReport {
        query: query.to_string(),
        count: results.len(),
        results,
    })
}
