use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use sessight_types::{EntryType, Event, utc_now};
use tracing::debug;

use super::command::command_name;
use super::schema::{
    AssistantMessage, ClaudeRecord, ContentBlock, IGNORED_TYPES, MessageContent, MessageRecord,
    SummaryRecord, UserMessage,
};
use super::tools::extract_tool_fields;
use crate::time::parse_timestamp;

/// Longest message text kept for search
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Map one raw log record to events.
///
/// `project_path` is the encoded project directory the record was read from.
/// Records that carry no analytics data, or lack an identifying field, map
/// to nothing.
pub fn parse_record(raw: &Value, project_path: &str) -> Vec<Event> {
    let record_type = raw.get("type").and_then(Value::as_str);
    if record_type.is_some_and(|t| IGNORED_TYPES.contains(&t)) {
        return Vec::new();
    }

    let record = match ClaudeRecord::deserialize(raw) {
        Ok(record) => record,
        Err(err) => {
            debug!(?record_type, error = %err, "skipping record with unexpected shape");
            return Vec::new();
        }
    };

    match record {
        ClaudeRecord::Summary(summary) => vec![summary_event(summary, project_path)],
        ClaudeRecord::Assistant(record) => {
            let Some(base) = RecordBase::from_record(&record, project_path) else {
                return Vec::new();
            };
            assistant_events(base, record.message)
        }
        ClaudeRecord::User(record) => {
            let Some(base) = RecordBase::from_record(&record, project_path) else {
                return Vec::new();
            };
            user_events(base, record.is_meta.unwrap_or(false), record.message)
        }
        ClaudeRecord::Unknown => Vec::new(),
    }
}

/// Identifying and context fields shared by every event of one record.
struct RecordBase {
    uuid: String,
    session_id: String,
    timestamp: NaiveDateTime,
    project_path: String,
    parent_uuid: Option<String>,
    git_branch: Option<String>,
    cwd: Option<String>,
    agent_id: Option<String>,
    is_sidechain: bool,
    version: Option<String>,
}

impl RecordBase {
    fn from_record<M>(record: &MessageRecord<M>, project_path: &str) -> Option<Self> {
        let uuid = record.uuid.as_deref().filter(|s| !s.is_empty())?;
        let session_id = record.session_id.as_deref().filter(|s| !s.is_empty())?;
        let raw_ts = record.timestamp.as_deref().filter(|s| !s.is_empty())?;

        let Some(timestamp) = parse_timestamp(raw_ts) else {
            debug!(uuid, timestamp = raw_ts, "skipping record with unparsable timestamp");
            return None;
        };

        Some(Self {
            uuid: uuid.to_string(),
            session_id: session_id.to_string(),
            timestamp,
            project_path: project_path.to_string(),
            parent_uuid: record.parent_uuid.clone(),
            git_branch: record.git_branch.clone(),
            cwd: record.cwd.clone(),
            agent_id: record.agent_id.clone(),
            is_sidechain: record.is_sidechain.unwrap_or(false),
            version: record.version.clone(),
        })
    }

    fn event(&self, uuid: String, entry_type: EntryType) -> Event {
        Event {
            parent_uuid: self.parent_uuid.clone(),
            git_branch: self.git_branch.clone(),
            cwd: self.cwd.clone(),
            agent_id: self.agent_id.clone(),
            is_sidechain: self.is_sidechain,
            version: self.version.clone(),
            ..Event::new(
                uuid,
                self.session_id.clone(),
                self.timestamp,
                self.project_path.clone(),
                entry_type,
            )
        }
    }
}

fn summary_event(summary: SummaryRecord, project_path: &str) -> Event {
    let uuid = summary.uuid.filter(|s| !s.is_empty()).unwrap_or_else(|| {
        format!(
            "summary:{}",
            summary.leaf_uuid.as_deref().unwrap_or("unknown")
        )
    });
    let session_id = summary
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let timestamp = summary
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(utc_now);

    Event {
        user_message_text: summary.summary.as_deref().map(truncate_chars),
        ..Event::new(uuid, session_id, timestamp, project_path, EntryType::Summary)
    }
}

fn assistant_events(base: RecordBase, message: Option<AssistantMessage>) -> Vec<Event> {
    let (model, usage, blocks) = match message {
        Some(message) => (
            message.model,
            message.usage.unwrap_or_default(),
            message
                .content
                .as_ref()
                .map(MessageContent::blocks)
                .unwrap_or_default(),
        ),
        None => (None, Default::default(), Vec::new()),
    };

    let mut turn = base.event(base.uuid.clone(), EntryType::Assistant);
    turn.input_tokens = usage.input_tokens;
    turn.output_tokens = usage.output_tokens;
    turn.cache_read_tokens = usage.cache_read_input_tokens;
    turn.cache_creation_tokens = usage.cache_creation_input_tokens;
    turn.model = model;

    let mut events = vec![turn];

    let tool_uses = blocks.into_iter().filter_map(|block| match block {
        ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
        _ => None,
    });

    for (index, (id, name, input)) in tool_uses.enumerate() {
        let suffix = id.clone().unwrap_or_else(|| format!("tool-{}", index));
        let input = input.unwrap_or_else(|| Value::Object(Default::default()));
        let fields = name
            .as_deref()
            .map(|n| extract_tool_fields(n, &input))
            .unwrap_or_default();

        let mut event = base.event(format!("{}:{}", base.uuid, suffix), EntryType::ToolUse);
        event.parent_uuid = Some(base.uuid.clone());
        event.tool_name = name;
        event.tool_id = id;
        event.tool_input_json = serde_json::to_string(&input).ok();
        event.command = fields.command;
        event.command_args = fields.command_args;
        event.file_path = fields.file_path;
        event.skill_name = fields.skill_name;
        events.push(event);
    }

    events
}

fn user_events(base: RecordBase, is_meta: bool, message: Option<UserMessage>) -> Vec<Event> {
    let content = message.and_then(|m| m.content);

    let blocks = content
        .as_ref()
        .map(MessageContent::blocks)
        .unwrap_or_default();
    let results: Vec<(Option<String>, bool)> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id,
                is_error,
            } => Some((tool_use_id.clone(), is_error.unwrap_or(false))),
            _ => None,
        })
        .collect();

    if !results.is_empty() {
        return results
            .into_iter()
            .map(|(tool_use_id, is_error)| {
                let suffix = tool_use_id.as_deref().unwrap_or("result");
                let mut event = base.event(
                    format!("{}:{}", base.uuid, suffix),
                    EntryType::ToolResult,
                );
                event.tool_id = tool_use_id;
                event.is_error = is_error;
                event
            })
            .collect();
    }

    let text = match &content {
        Some(MessageContent::Text(text)) => Some(text.clone()),
        Some(MessageContent::Blocks(_)) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => text.as_deref(),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    };

    let command = if is_meta {
        text.as_deref().and_then(command_name)
    } else {
        None
    };

    let entry_type = if command.is_some() {
        EntryType::Command
    } else {
        EntryType::User
    };

    let mut event = base.event(base.uuid.clone(), entry_type);
    event.skill_name = command;
    event.user_message_text = text.as_deref().map(truncate_chars);
    vec![event]
}

fn truncate_chars(text: &str) -> String {
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assistant_with_tools() -> Value {
        json!({
            "type": "assistant",
            "uuid": "a1",
            "parentUuid": "u0",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:00:00.000Z",
            "cwd": "/work/app",
            "gitBranch": "main",
            "version": "2.0.14",
            "message": {
                "model": "claude-sonnet-4-5",
                "usage": {
                    "input_tokens": 120,
                    "output_tokens": 45,
                    "cache_read_input_tokens": 1000,
                    "cache_creation_input_tokens": 10
                },
                "content": [
                    {"type": "text", "text": "Reading the file"},
                    {"type": "tool_use", "id": "toolu_1", "name": "Read", "input": {"file_path": "/work/app/src/lib.rs"}},
                    {"type": "tool_use", "name": "Bash", "input": {"command": "cargo test -p core"}}
                ]
            }
        })
    }

    #[test]
    fn test_assistant_record_emits_turn_and_tools() {
        let events = parse_record(&assistant_with_tools(), "-work-app");
        assert_eq!(events.len(), 3);

        let turn = &events[0];
        assert_eq!(turn.entry_type, EntryType::Assistant);
        assert_eq!(turn.uuid, "a1");
        assert_eq!(turn.input_tokens, Some(120));
        assert_eq!(turn.output_tokens, Some(45));
        assert_eq!(turn.cache_read_tokens, Some(1000));
        assert_eq!(turn.cache_creation_tokens, Some(10));
        assert_eq!(turn.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(turn.parent_uuid.as_deref(), Some("u0"));

        let read = &events[1];
        assert_eq!(read.entry_type, EntryType::ToolUse);
        assert_eq!(read.uuid, "a1:toolu_1");
        assert_eq!(read.parent_uuid.as_deref(), Some("a1"));
        assert_eq!(read.tool_id.as_deref(), Some("toolu_1"));
        assert_eq!(read.file_path.as_deref(), Some("/work/app/src/lib.rs"));
        assert!(!read.has_tokens());

        let bash = &events[2];
        assert_eq!(bash.uuid, "a1:tool-1");
        assert_eq!(bash.tool_id, None);
        assert_eq!(bash.command.as_deref(), Some("cargo"));
        assert_eq!(bash.command_args.as_deref(), Some("test -p core"));
        assert!(!bash.has_tokens());
        assert_eq!(bash.git_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_tokens_counted_once_per_turn() {
        let events = parse_record(&assistant_with_tools(), "p");
        let total: i64 = events.iter().filter_map(|e| e.input_tokens).sum();
        assert_eq!(total, 120);
    }

    #[test]
    fn test_tool_results_become_one_event_each() {
        let raw = json!({
            "type": "user",
            "uuid": "u2",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:00:05Z",
            "message": {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"},
                {"type": "tool_result", "tool_use_id": "toolu_2", "is_error": true, "content": "boom"},
                {"type": "tool_result", "content": "orphan"}
            ]}
        });
        let events = parse_record(&raw, "p");
        let uuids: Vec<&str> = events.iter().map(|e| e.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["u2:toolu_1", "u2:toolu_2", "u2:result"]);
        assert!(events.iter().all(|e| e.entry_type == EntryType::ToolResult));
        assert!(!events[0].is_error);
        assert!(events[1].is_error);
        assert_eq!(events[1].tool_id.as_deref(), Some("toolu_2"));
        assert_eq!(events[2].tool_id, None);
    }

    #[test]
    fn test_user_text_is_joined_and_capped() {
        let raw = json!({
            "type": "user",
            "uuid": "u1",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:00:00Z",
            "message": {"content": [
                {"type": "text", "text": "fix the"},
                {"type": "image", "source": {}},
                {"type": "text", "text": "login bug"}
            ]}
        });
        let events = parse_record(&raw, "p");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entry_type, EntryType::User);
        assert_eq!(events[0].user_message_text.as_deref(), Some("fix the login bug"));

        let long = json!({
            "type": "user",
            "uuid": "u9",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:00:00Z",
            "message": {"content": "é".repeat(MAX_MESSAGE_CHARS + 50)}
        });
        let events = parse_record(&long, "p");
        let text = events[0].user_message_text.as_deref().unwrap();
        assert_eq!(text.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_meta_message_with_heading_is_command() {
        let raw = json!({
            "type": "user",
            "uuid": "u3",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:01:00Z",
            "isMeta": true,
            "message": {"content": "# Commit Changes\n\nStage and commit."}
        });
        let events = parse_record(&raw, "p");
        assert_eq!(events[0].entry_type, EntryType::Command);
        assert_eq!(events[0].skill_name.as_deref(), Some("commit-changes"));

        let mut not_meta = raw.clone();
        not_meta["isMeta"] = json!(false);
        let events = parse_record(&not_meta, "p");
        assert_eq!(events[0].entry_type, EntryType::User);
        assert_eq!(events[0].skill_name, None);

        let mut generic = raw;
        generic["message"]["content"] = json!("# Context\n\nbackground text");
        assert_eq!(parse_record(&generic, "p")[0].entry_type, EntryType::User);
    }

    #[test]
    fn test_summary_uses_fallbacks() {
        let raw = json!({"type": "summary", "summary": "Refactored parser", "leafUuid": "leaf-9"});
        let events = parse_record(&raw, "p");
        assert_eq!(events.len(), 1);
        let summary = &events[0];
        assert_eq!(summary.entry_type, EntryType::Summary);
        assert_eq!(summary.uuid, "summary:leaf-9");
        assert_eq!(summary.session_id, "unknown");
        assert_eq!(summary.user_message_text.as_deref(), Some("Refactored parser"));

        let bare = parse_record(&json!({"type": "summary"}), "p");
        assert_eq!(bare[0].uuid, "summary:unknown");
    }

    #[test]
    fn test_records_without_identity_are_dropped() {
        let missing_session = json!({"type": "user", "uuid": "u1", "timestamp": "2025-01-15T10:00:00Z"});
        assert!(parse_record(&missing_session, "p").is_empty());

        let bad_ts = json!({"type": "user", "uuid": "u1", "sessionId": "s1", "timestamp": "soon"});
        assert!(parse_record(&bad_ts, "p").is_empty());
    }

    #[test]
    fn test_ignored_and_unknown_types_produce_nothing() {
        for kind in IGNORED_TYPES {
            let raw = json!({"type": kind, "uuid": "x", "sessionId": "s", "timestamp": "2025-01-15T10:00:00Z"});
            assert!(parse_record(&raw, "p").is_empty(), "{kind}");
        }
        let unknown = json!({"type": "system", "uuid": "x", "sessionId": "s", "timestamp": "2025-01-15T10:00:00Z"});
        assert!(parse_record(&unknown, "p").is_empty());
        assert!(parse_record(&json!({"no": "type"}), "p").is_empty());
    }

    #[test]
    fn test_sidechain_fields_are_kept() {
        let raw = json!({
            "type": "user",
            "uuid": "u5",
            "sessionId": "s1",
            "timestamp": "2025-01-15T10:00:00Z",
            "isSidechain": true,
            "agentId": "be466c0a",
            "message": {"content": "explore"}
        });
        let events = parse_record(&raw, "p");
        assert!(events[0].is_sidechain);
        assert_eq!(events[0].agent_id.as_deref(), Some("be466c0a"));
    }
}
