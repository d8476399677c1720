//! Raw record shapes of Claude Code session logs.
//!
//! Every field is optional: a record missing something the parser needs is
//! dropped by the parser, never by deserialization.

use serde::Deserialize;
use serde_json::Value;

/// Top-level record types that never carry analytics data
pub(crate) const IGNORED_TYPES: &[&str] = &[
    "file-history-snapshot",
    "queue-operation",
    "create",
    "thinking",
    "text",
    "tool_use",
    "tool_result",
    "message",
];

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub(crate) enum ClaudeRecord {
    User(MessageRecord<UserMessage>),
    Assistant(MessageRecord<AssistantMessage>),
    Summary(SummaryRecord),
    #[serde(other)]
    Unknown,
}

/// Fields shared by user and assistant records.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageRecord<M> {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub is_sidechain: Option<bool>,
    #[serde(default)]
    pub is_meta: Option<bool>,
    #[serde(default)]
    pub message: Option<M>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub leaf_uuid: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssistantMessage {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenUsage {
    #[serde(default)]
    pub input_tokens: Option<i64>,
    #[serde(default)]
    pub output_tokens: Option<i64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<i64>,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<i64>,
}

/// Message content is either plain text or a list of typed blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Blocks(Vec<Value>),
    Other(Value),
}

impl MessageContent {
    /// Blocks that deserialize; anything else is ignored.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Blocks(values) => values
                .iter()
                .filter_map(|v| ContentBlock::deserialize(v).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Option<Value>,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_without_message_deserialize() {
        let user = ClaudeRecord::deserialize(json!({ "type": "user", "uuid": "u1" })).unwrap();
        match user {
            ClaudeRecord::User(record) => {
                assert_eq!(record.uuid.as_deref(), Some("u1"));
                assert!(record.message.is_none());
            }
            other => panic!("unexpected record: {other:?}"),
        }

        let assistant = ClaudeRecord::deserialize(json!({ "type": "assistant" })).unwrap();
        assert!(matches!(assistant, ClaudeRecord::Assistant(r) if r.message.is_none()));
    }

    #[test]
    fn test_unknown_record_type() {
        let record = ClaudeRecord::deserialize(json!({ "type": "progress" })).unwrap();
        assert!(matches!(record, ClaudeRecord::Unknown));
    }
}
