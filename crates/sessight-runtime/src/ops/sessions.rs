use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sessight_engine::{JourneyStep, trace_journey};
use sessight_index::{Database, EventFilter, RelatedBy};
use sessight_types::{EntryType, Event, RelatedSession, Session, TimeWindow, utc_now};

use crate::{Error, Result};

/// Events returned when the caller sets no limit
pub const DEFAULT_EVENT_LIMIT: usize = 100;
/// Message types shown when the caller names none
pub const DEFAULT_MESSAGE_TYPES: [EntryType; 2] = [EntryType::User, EntryType::Assistant];

fn require_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionListReport {
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub session_count: usize,
    pub total_entries: i64,
    pub total_tool_uses: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub sessions: Vec<Session>,
}

/// Sessions whose last activity falls in the last `days` days, most recent
/// first, with their combined totals.
pub fn list_sessions(db: &Database, days: u32, project: Option<&str>) -> Result<SessionListReport> {
    let since = TimeWindow::last_days(days).start;
    let sessions = db.sessions_active_since(&since, project)?;

    Ok(SessionListReport {
        days,
        project: project.map(str::to_string),
        session_count: sessions.len(),
        total_entries: sessions.iter().map(|s| s.entry_count).sum(),
        total_tool_uses: sessions.iter().map(|s| s.tool_use_count).sum(),
        total_input_tokens: sessions.iter().map(|s| s.total_input_tokens).sum(),
        total_output_tokens: sessions.iter().map(|s| s.total_output_tokens).sum(),
        sessions,
    })
}

/// One row of an event timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub timestamp: NaiveDateTime,
    pub session_id: String,
    pub entry_type: EntryType,
    pub tool_name: Option<String>,
    pub command: Option<String>,
    pub file_path: Option<String>,
    pub skill_name: Option<String>,
    pub is_error: bool,
}

impl From<Event> for TimelineEvent {
    fn from(event: Event) -> Self {
        Self {
            timestamp: event.timestamp,
            session_id: event.session_id,
            entry_type: event.entry_type,
            tool_name: event.tool_name,
            command: event.command,
            file_path: event.file_path,
            skill_name: event.skill_name,
            is_error: event.is_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineReport {
    /// `None` when a whole session was requested
    pub window: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub count: usize,
    pub events: Vec<TimelineEvent>,
}

/// Events in time order.
///
/// Without a window the last day is shown, unless the filter names a
/// session, in which case its whole trace is returned. The limit defaults to
/// [`DEFAULT_EVENT_LIMIT`].
pub fn session_events(db: &Database, mut filter: EventFilter) -> Result<TimelineReport> {
    if filter.window.is_none() && filter.session_id.is_none() {
        filter.window = Some(TimeWindow::last_days(1));
    }
    let limit = filter.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    require_limit(limit)?;
    filter.limit = Some(limit);

    let events: Vec<TimelineEvent> = db
        .get_events(&filter)?
        .into_iter()
        .map(TimelineEvent::from)
        .collect();

    Ok(TimelineReport {
        window: filter.window,
        tool: filter.tool_name,
        project: filter.project,
        session_id: filter.session_id,
        count: events.len(),
        events,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesReport {
    pub hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub entry_types: Vec<EntryType>,
    pub message_count: usize,
    pub projects_visited: Vec<String>,
    pub project_switches: usize,
    pub messages: Vec<JourneyStep>,
}

/// Messages of the last `hours` hours across sessions, oldest first.
///
/// An empty `entry_types` means [`DEFAULT_MESSAGE_TYPES`]. Messages are cut
/// to `max_chars` characters; zero keeps them whole.
pub fn session_messages(
    db: &Database,
    hours: u32,
    session_id: Option<&str>,
    entry_types: &[EntryType],
    limit: usize,
    max_chars: usize,
) -> Result<MessagesReport> {
    require_limit(limit)?;
    let entry_types = if entry_types.is_empty() {
        DEFAULT_MESSAGE_TYPES.to_vec()
    } else {
        entry_types.to_vec()
    };

    let since = utc_now() - Duration::hours(i64::from(hours));
    let events = db.messages_since(&since, session_id, &entry_types, limit)?;
    let journey = trace_journey(&events, max_chars);

    Ok(MessagesReport {
        hours,
        session_id: session_id.map(str::to_string),
        entry_types,
        message_count: journey.steps.len(),
        projects_visited: journey.projects_visited,
        project_switches: journey.project_switches,
        messages: journey.steps,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedSessionsReport {
    pub session_id: String,
    pub by: RelatedBy,
    pub related_count: usize,
    pub related: Vec<RelatedSession>,
}

/// Sessions sharing files or commands with `session_id` in the last `days`
/// days, or active within an hour of it.
pub fn related_sessions(
    db: &Database,
    session_id: &str,
    by: RelatedBy,
    days: u32,
    limit: usize,
) -> Result<RelatedSessionsReport> {
    require_limit(limit)?;
    let related = db.related_sessions(session_id, by, &TimeWindow::last_days(days), limit)?;

    Ok(RelatedSessionsReport {
        session_id: session_id.to_string(),
        by,
        related_count: related.len(),
        related,
    })
}
