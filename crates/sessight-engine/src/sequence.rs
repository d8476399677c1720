//! Tool n-gram mining.

use chrono::NaiveDateTime;
use serde::Serialize;
use sessight_types::ToolStep;
use std::collections::HashMap;

/// Separator between tool names in a sequence key
pub const SEQUENCE_SEPARATOR: &str = " → ";

/// A contiguous run of tools and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceCount {
    pub key: String,
    pub tools: Vec<String>,
    pub count: i64,
    /// Time of the last step of the most recent occurrence
    pub last_seen: NaiveDateTime,
}

pub fn sequence_key(tools: &[String]) -> String {
    tools.join(SEQUENCE_SEPARATOR)
}

/// Count every window of `length` consecutive tools within each session.
///
/// `steps` must be ordered by session, then time; a window never spans two
/// sessions. Sequences seen fewer than `min_count` times are dropped. The
/// result is sorted by count descending, then key.
pub fn mine_sequences(steps: &[ToolStep], length: usize, min_count: i64) -> Vec<SequenceCount> {
    if length == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<Vec<&str>, (i64, NaiveDateTime)> = HashMap::new();

    for session in steps.chunk_by(|a, b| a.session_id == b.session_id) {
        for window in session.windows(length) {
            let tools: Vec<&str> = window.iter().map(|s| s.tool_name.as_str()).collect();
            let end = window[length - 1].timestamp;
            counts
                .entry(tools)
                .and_modify(|(count, last)| {
                    *count += 1;
                    *last = (*last).max(end);
                })
                .or_insert((1, end));
        }
    }

    let mut sequences: Vec<SequenceCount> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_count)
        .map(|(tools, (count, last_seen))| {
            let tools: Vec<String> = tools.into_iter().map(str::to_string).collect();
            SequenceCount {
                key: sequence_key(&tools),
                tools,
                count,
                last_seen,
            }
        })
        .collect();

    sequences.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    sequences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, step};

    #[test]
    fn test_bigrams_within_one_session() {
        let steps = vec![
            step("s1", 0, "Read"),
            step("s1", 1, "Edit"),
            step("s1", 2, "Read"),
            step("s1", 3, "Edit"),
        ];

        let seqs = mine_sequences(&steps, 2, 1);
        let summary: Vec<(&str, i64)> = seqs.iter().map(|s| (s.key.as_str(), s.count)).collect();
        assert_eq!(summary, vec![("Read → Edit", 2), ("Edit → Read", 1)]);
        assert_eq!(seqs[0].tools, vec!["Read", "Edit"]);
        assert_eq!(seqs[0].last_seen, at(3));
    }

    #[test]
    fn test_same_pair_in_three_sessions() {
        let steps: Vec<ToolStep> = ["s1", "s2", "s3"]
            .iter()
            .enumerate()
            .flat_map(|(i, session)| {
                let minute = i as i64 * 10;
                [step(session, minute, "Read"), step(session, minute + 1, "Edit")]
            })
            .collect();

        let seqs = mine_sequences(&steps, 2, 1);
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].key, "Read → Edit");
        assert_eq!(seqs[0].count, 3);

        assert!(mine_sequences(&steps, 2, 5).is_empty());
    }

    #[test]
    fn test_windows_do_not_cross_sessions() {
        let steps = vec![
            step("s1", 0, "Read"),
            step("s1", 1, "Edit"),
            step("s2", 2, "Bash"),
            step("s2", 3, "Read"),
        ];

        let keys: Vec<String> = mine_sequences(&steps, 2, 1)
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["Bash → Read", "Read → Edit"]);
    }

    #[test]
    fn test_min_count_and_short_sessions() {
        let steps = vec![
            step("s1", 0, "Read"),
            step("s1", 1, "Edit"),
            step("s1", 2, "Bash"),
            step("s2", 3, "Read"),
            step("s2", 4, "Edit"),
            step("s3", 5, "Read"),
        ];

        let seqs = mine_sequences(&steps, 2, 2);
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].key, "Read → Edit");
        assert_eq!(seqs[0].count, 2);

        let trigrams = mine_sequences(&steps, 3, 1);
        assert_eq!(trigrams.len(), 1);
        assert_eq!(trigrams[0].key, "Read → Edit → Bash");

        assert!(mine_sequences(&steps, 0, 1).is_empty());
    }
}
