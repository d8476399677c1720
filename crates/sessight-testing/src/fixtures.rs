//! Builders for Claude Code JSONL session logs.
//!
//! Each builder method appends the records the assistant would write for one
//! interaction. Times are given in minutes after the log's start.

use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::{Value, json};

/// A session log under construction.
#[derive(Debug, Clone)]
pub struct SessionLog {
    session_id: String,
    cwd: String,
    branch: Option<String>,
    start: NaiveDateTime,
    lines: Vec<String>,
    seq: usize,
    last_uuid: Option<String>,
}

impl SessionLog {
    /// Start a log for `session_id` one hour ago.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: "/work/app".to_string(),
            branch: Some("main".to_string()),
            start: Utc::now().naive_utc() - Duration::hours(1),
            lines: Vec::new(),
            seq: 0,
            last_uuid: None,
        }
    }

    /// Start a log with a random session id.
    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Move the start of an empty log.
    ///
    /// # Panics
    /// When records were already added; their times are fixed at creation.
    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        assert!(
            self.lines.is_empty(),
            "starting_at must be called before any record is added"
        );
        self.start = start;
        self
    }

    pub fn with_cwd(mut self, cwd: &str) -> Self {
        self.cwd = cwd.to_string();
        self
    }

    pub fn with_branch(mut self, branch: Option<&str>) -> Self {
        self.branch = branch.map(str::to_string);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Absolute time of `minute`.
    pub fn at(&self, minute: i64) -> NaiveDateTime {
        self.start + Duration::minutes(minute)
    }

    /// A plain user prompt.
    pub fn user(mut self, minute: i64, text: &str) -> Self {
        let uuid = self.next_uuid("u");
        let record = self.envelope("user", &uuid, self.at(minute));
        self.push(record, json!({ "role": "user", "content": text }));
        self
    }

    /// A slash command expansion, recorded as a meta user message.
    pub fn slash_command(mut self, minute: i64, heading: &str) -> Self {
        let uuid = self.next_uuid("u");
        let mut record = self.envelope("user", &uuid, self.at(minute));
        record["isMeta"] = json!(true);
        let text = format!("# {}\n\nFollow the instructions.", heading);
        self.push(
            record,
            json!({ "role": "user", "content": [{ "type": "text", "text": text }] }),
        );
        self
    }

    /// An assistant text reply with token usage.
    pub fn reply(mut self, minute: i64, text: &str, input_tokens: i64, output_tokens: i64) -> Self {
        let uuid = self.next_uuid("a");
        let record = self.envelope("assistant", &uuid, self.at(minute));
        self.push(
            record,
            json!({
                "model": "claude-sonnet-4-5",
                "usage": { "input_tokens": input_tokens, "output_tokens": output_tokens },
                "content": [{ "type": "text", "text": text }],
            }),
        );
        self
    }

    /// A tool call and its successful result.
    pub fn tool(self, minute: i64, name: &str, input: Value) -> Self {
        self.tool_call(minute, name, input, false)
    }

    /// A tool call whose result is an error.
    pub fn failing_tool(self, minute: i64, name: &str, input: Value) -> Self {
        self.tool_call(minute, name, input, true)
    }

    pub fn read(self, minute: i64, file: &str) -> Self {
        self.tool(minute, "Read", json!({ "file_path": file }))
    }

    pub fn edit(self, minute: i64, file: &str) -> Self {
        self.tool(
            minute,
            "Edit",
            json!({ "file_path": file, "old_string": "a", "new_string": "b" }),
        )
    }

    pub fn bash(self, minute: i64, command: &str) -> Self {
        self.tool(minute, "Bash", json!({ "command": command }))
    }

    /// A `summary` record pointing at the last message.
    pub fn summary(mut self, text: &str) -> Self {
        let leaf = self.last_uuid.clone().unwrap_or_default();
        self.lines.push(
            json!({ "type": "summary", "summary": text, "leafUuid": leaf }).to_string(),
        );
        self
    }

    /// A line that is not valid JSON.
    pub fn garbage(mut self) -> Self {
        self.lines.push("{\"type\": \"user\", \"uuid\": ".to_string());
        self
    }

    /// Records in the log, garbage lines included.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_jsonl(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn tool_call(mut self, minute: i64, name: &str, input: Value, is_error: bool) -> Self {
        let ts = self.at(minute);
        let tool_id = format!("toolu_{}_{:03}", self.session_id.replace('-', ""), self.seq);

        let uuid = self.next_uuid("a");
        let record = self.envelope("assistant", &uuid, ts);
        self.push(
            record,
            json!({
                "model": "claude-sonnet-4-5",
                "usage": { "input_tokens": 100, "output_tokens": 20 },
                "content": [{ "type": "tool_use", "id": tool_id, "name": name, "input": input }],
            }),
        );

        let uuid = self.next_uuid("u");
        let record = self.envelope("user", &uuid, ts + Duration::seconds(2));
        let output = if is_error { "Error: failed" } else { "ok" };
        self.push(
            record,
            json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": tool_id,
                    "is_error": is_error,
                    "content": output,
                }],
            }),
        );
        self
    }

    fn next_uuid(&mut self, kind: &str) -> String {
        self.seq += 1;
        format!("{}-{}{:03}", self.session_id, kind, self.seq)
    }

    fn envelope(&self, record_type: &str, uuid: &str, ts: NaiveDateTime) -> Value {
        let mut record = json!({
            "type": record_type,
            "uuid": uuid,
            "parentUuid": self.last_uuid,
            "sessionId": self.session_id,
            "timestamp": ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "cwd": self.cwd,
            "version": "2.0.14",
        });
        if let Some(branch) = &self.branch {
            record["gitBranch"] = json!(branch);
        }
        record
    }

    fn push(&mut self, mut record: Value, message: Value) {
        record["message"] = message;
        self.last_uuid = record["uuid"].as_str().map(str::to_string);
        self.lines.push(record.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_writes_use_and_result() {
        let log = SessionLog::new("s1").read(0, "/work/app/src/lib.rs");
        assert_eq!(log.len(), 2);

        let lines: Vec<Value> = log
            .to_jsonl()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let tool_id = &lines[0]["message"]["content"][0]["id"];
        assert_eq!(&lines[1]["message"]["content"][0]["tool_use_id"], tool_id);
        assert_eq!(lines[1]["parentUuid"], lines[0]["uuid"]);
    }

    #[test]
    fn test_minutes_are_relative_to_start() {
        let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let log = SessionLog::new("s1").starting_at(start).user(90, "hi");
        assert!(log.to_jsonl().contains("\"timestamp\":\"2025-01-01T09:30:00.000Z\""));
    }

    #[test]
    #[should_panic(expected = "before any record")]
    fn test_starting_at_rejects_existing_records() {
        let _ = SessionLog::new("s1").user(0, "hi").starting_at(Utc::now().naive_utc());
    }
}
