use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Kind of log entry an [`Event`] was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Assistant,
    ToolUse,
    ToolResult,
    User,
    Command,
    Summary,
}

impl EntryType {
    pub const ALL: [EntryType; 6] = [
        EntryType::Assistant,
        EntryType::ToolUse,
        EntryType::ToolResult,
        EntryType::User,
        EntryType::Command,
        EntryType::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Assistant => "assistant",
            EntryType::ToolUse => "tool_use",
            EntryType::ToolResult => "tool_result",
            EntryType::User => "user",
            EntryType::Command => "command",
            EntryType::Summary => "summary",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownTag {
                kind: "entry type",
                value: s.to_string(),
            })
    }
}

/// One observed occurrence inside a session.
///
/// `(session_id, uuid)` identifies an event; the store drops duplicates.
/// Token counts appear only on assistant events, never on the tool_use
/// events that reference them through `parent_uuid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store row id, `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub uuid: String,
    pub session_id: String,
    pub timestamp: NaiveDateTime,
    pub project_path: String,
    pub entry_type: EntryType,

    pub tool_name: Option<String>,
    pub tool_input_json: Option<String>,
    pub tool_id: Option<String>,
    pub is_error: bool,

    /// Program of a shell invocation (first token)
    pub command: Option<String>,
    /// Remainder of a shell invocation after the program
    pub command_args: Option<String>,
    pub file_path: Option<String>,
    /// Skill, slash command or sub-agent type
    pub skill_name: Option<String>,

    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cache_read_tokens: Option<i64>,
    pub cache_creation_tokens: Option<i64>,
    pub model: Option<String>,

    pub git_branch: Option<String>,
    pub cwd: Option<String>,
    pub user_message_text: Option<String>,

    pub parent_uuid: Option<String>,
    pub agent_id: Option<String>,
    pub is_sidechain: bool,
    pub version: Option<String>,
}

impl Event {
    /// Create an event with only the identifying fields set.
    pub fn new(
        uuid: impl Into<String>,
        session_id: impl Into<String>,
        timestamp: NaiveDateTime,
        project_path: impl Into<String>,
        entry_type: EntryType,
    ) -> Self {
        Self {
            id: None,
            uuid: uuid.into(),
            session_id: session_id.into(),
            timestamp,
            project_path: project_path.into(),
            entry_type,
            tool_name: None,
            tool_input_json: None,
            tool_id: None,
            is_error: false,
            command: None,
            command_args: None,
            file_path: None,
            skill_name: None,
            input_tokens: None,
            output_tokens: None,
            cache_read_tokens: None,
            cache_creation_tokens: None,
            model: None,
            git_branch: None,
            cwd: None,
            user_message_text: None,
            parent_uuid: None,
            agent_id: None,
            is_sidechain: false,
            version: None,
        }
    }

    pub fn has_tokens(&self) -> bool {
        self.input_tokens.is_some()
            || self.output_tokens.is_some()
            || self.cache_read_tokens.is_some()
            || self.cache_creation_tokens.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trips_through_str() {
        for t in EntryType::ALL {
            assert_eq!(t.as_str().parse::<EntryType>().unwrap(), t);
        }
        assert!("thinking".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_entry_type_serializes_snake_case() {
        let json = serde_json::to_string(&EntryType::ToolResult).unwrap();
        assert_eq!(json, "\"tool_result\"");
    }
}
