//! Concrete instances of a tool sequence, with surrounding context.

use chrono::NaiveDateTime;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use sessight_types::ToolStep;
use std::fmt;

/// Longest sequence pattern accepted, in characters
pub const MAX_PATTERN_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    TooLong { len: usize },
    InvalidTool(String),
    TooFewTools(usize),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::TooLong { len } => write!(
                f,
                "pattern too long: {} characters (max {})",
                len, MAX_PATTERN_CHARS
            ),
            PatternError::InvalidTool(tool) => {
                write!(f, "invalid tool name '{}': use letters, digits or '_'", tool)
            }
            PatternError::TooFewTools(n) => {
                write!(f, "pattern must name at least 2 tools, got {}", n)
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Parse `"Read → Edit"` or `"Read,Edit"` into tool names.
pub fn parse_sequence_pattern(pattern: &str) -> Result<Vec<String>, PatternError> {
    let len = pattern.chars().count();
    if len > MAX_PATTERN_CHARS {
        return Err(PatternError::TooLong { len });
    }

    let separator = if pattern.contains('→') { '→' } else { ',' };
    let tools: Vec<String> = pattern
        .split(separator)
        .map(|t| t.trim().to_string())
        .collect();

    if let Some(bad) = tools
        .iter()
        .find(|t| t.is_empty() || !t.chars().all(|c| c.is_alphanumeric() || c == '_'))
    {
        return Err(PatternError::InvalidTool(bad.clone()));
    }
    if tools.len() < 2 {
        return Err(PatternError::TooFewTools(tools.len()));
    }

    Ok(tools)
}

/// One step around a matched sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextStep {
    pub tool: String,
    pub timestamp: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub is_match: bool,
}

/// A place where the sequence occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub session_id: String,
    pub project: String,
    /// Time of the first matched step
    pub timestamp: NaiveDateTime,
    pub events: Vec<ContextStep>,
}

/// Every contiguous match of `tools` within a session, with up to `context`
/// steps on each side.
///
/// `steps` must be ordered by session, then time.
pub fn find_occurrences(steps: &[ToolStep], tools: &[String], context: usize) -> Vec<Occurrence> {
    let len = tools.len();
    let mut found = Vec::new();
    if len == 0 {
        return found;
    }

    for session in steps.chunk_by(|a, b| a.session_id == b.session_id) {
        if session.len() < len {
            continue;
        }
        for start in 0..=session.len() - len {
            let matched = session[start..start + len]
                .iter()
                .zip(tools)
                .all(|(step, tool)| step.tool_name == *tool);
            if !matched {
                continue;
            }

            let from = start.saturating_sub(context);
            let to = (start + len + context).min(session.len());
            let events = session[from..to]
                .iter()
                .enumerate()
                .map(|(offset, step)| {
                    let idx = from + offset;
                    ContextStep {
                        tool: step.tool_name.clone(),
                        timestamp: step.timestamp,
                        file: step.file_path.clone(),
                        command: step.command.clone(),
                        is_match: (start..start + len).contains(&idx),
                    }
                })
                .collect();

            let first = &session[start];
            found.push(Occurrence {
                session_id: first.session_id.clone(),
                project: first.project_path.clone(),
                timestamp: first.timestamp,
                events,
            });
        }
    }

    found
}

/// Uniform sample of `count` occurrences without replacement.
///
/// With `count` or fewer occurrences all of them are returned in order.
pub fn sample_occurrences<R: Rng + ?Sized>(
    occurrences: Vec<Occurrence>,
    count: usize,
    rng: &mut R,
) -> Vec<Occurrence> {
    if occurrences.len() <= count {
        return occurrences;
    }
    occurrences
        .choose_multiple(rng, count)
        .cloned()
        .collect()
}
