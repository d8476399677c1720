use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Per-session rollup, rebuilt from events after every ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_path: String,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub entry_count: i64,
    pub tool_use_count: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    /// Most recently observed git branch
    pub primary_branch: Option<String>,
}

impl Session {
    pub fn duration_minutes(&self) -> f64 {
        (self.last_seen - self.first_seen).num_seconds() as f64 / 60.0
    }
}

/// Fingerprint of a source file as of its last complete parse pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionState {
    pub file_path: String,
    pub file_size: i64,
    pub last_modified: NaiveDateTime,
    pub entries_processed: i64,
    pub last_processed: NaiveDateTime,
}

impl IngestionState {
    /// True when a file with this size and mtime needs no reprocessing.
    pub fn is_unchanged(&self, file_size: i64, modified: NaiveDateTime) -> bool {
        self.file_size == file_size && self.last_modified >= modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_fingerprint_detects_growth_and_touch() {
        let state = IngestionState {
            file_path: "/logs/a.jsonl".to_string(),
            file_size: 100,
            last_modified: at(10, 0),
            entries_processed: 4,
            last_processed: at(10, 1),
        };

        assert!(state.is_unchanged(100, at(10, 0)));
        assert!(state.is_unchanged(100, at(9, 59)));
        assert!(!state.is_unchanged(120, at(10, 0)));
        assert!(!state.is_unchanged(100, at(10, 5)));
    }
}
