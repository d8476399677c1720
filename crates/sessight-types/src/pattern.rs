use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ToolFrequency,
    CommandFrequency,
    ToolSequence,
    PermissionGap,
}

impl PatternType {
    pub const ALL: [PatternType; 4] = [
        PatternType::ToolFrequency,
        PatternType::CommandFrequency,
        PatternType::ToolSequence,
        PatternType::PermissionGap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::ToolFrequency => "tool_frequency",
            PatternType::CommandFrequency => "command_frequency",
            PatternType::ToolSequence => "tool_sequence",
            PatternType::PermissionGap => "permission_gap",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownTag {
                kind: "pattern type",
                value: s.to_string(),
            })
    }
}

/// A cached analytic fact, unique per `(pattern_type, pattern_key)`.
///
/// Patterns are recomputed wholesale on refresh and never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_type: PatternType,
    pub pattern_key: String,
    pub count: i64,
    pub last_seen: Option<NaiveDateTime>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub computed_at: NaiveDateTime,
}

impl Pattern {
    pub fn new(
        pattern_type: PatternType,
        pattern_key: impl Into<String>,
        count: i64,
        computed_at: NaiveDateTime,
    ) -> Self {
        Self {
            pattern_type,
            pattern_key: pattern_key.into(),
            count,
            last_seen: None,
            metadata: Map::new(),
            computed_at,
        }
    }

    pub fn with_last_seen(mut self, last_seen: Option<NaiveDateTime>) -> Self {
        self.last_seen = last_seen;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}
