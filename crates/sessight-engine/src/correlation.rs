//! Attribution of commits to the sessions they were made in.

use chrono::Duration;
use serde::Serialize;
use sessight_types::{GitCommit, SessionCommit, SessionSpan};
use std::collections::HashMap;
use tracing::debug;

/// Slack added on both sides of a session span
pub const DEFAULT_BUFFER_MINUTES: i64 = 5;

/// Result of one attribution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    /// `(sha, session_id)` pairs for commits that found a session
    pub assignments: Vec<(String, String)>,
    pub links: Vec<SessionCommit>,
}

/// Attribute each commit without a session to the first span that covers it.
///
/// Spans are tried latest start first, then by session id, so a commit that
/// falls into several overlapping sessions always lands in the same one. The
/// span is widened by `buffer` on both sides and the bounds are inclusive.
/// Commits without a timestamp or already attributed are left alone.
pub fn attribute_commits(
    spans: &[SessionSpan],
    commits: &[GitCommit],
    buffer: Duration,
) -> Attribution {
    let mut ordered: Vec<&SessionSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        b.start
            .cmp(&a.start)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    let mut attribution = Attribution::default();
    for commit in commits {
        if commit.session_id().is_some() {
            continue;
        }
        let Some(ts) = commit.timestamp() else {
            continue;
        };
        let Some(span) = ordered
            .iter()
            .find(|s| ts >= s.start - buffer && ts <= s.end + buffer)
        else {
            continue;
        };

        attribution
            .assignments
            .push((commit.sha().to_string(), span.session_id.clone()));
        attribution.links.push(SessionCommit {
            session_id: span.session_id.clone(),
            commit_sha: commit.sha().to_string(),
            time_to_commit_seconds: (ts - span.start).num_seconds().max(0),
            is_first_commit: false,
        });
    }

    mark_first_commits(&mut attribution.links, commits);

    debug!(
        sessions = spans.len(),
        commits = commits.len(),
        attributed = attribution.links.len(),
        "attributed commits"
    );
    attribution
}

/// Flag the earliest commit of each session, ties broken by sha.
fn mark_first_commits(links: &mut [SessionCommit], commits: &[GitCommit]) {
    let times: HashMap<&str, _> = commits
        .iter()
        .filter_map(|c| c.timestamp().map(|ts| (c.sha(), ts)))
        .collect();

    let mut first: HashMap<String, usize> = HashMap::new();
    for (idx, link) in links.iter().enumerate() {
        let key = |i: usize| {
            let l = &links[i];
            (times.get(l.commit_sha.as_str()).copied(), l.commit_sha.clone())
        };
        first
            .entry(link.session_id.clone())
            .and_modify(|best| {
                if key(idx) < key(*best) {
                    *best = idx;
                }
            })
            .or_insert(idx);
    }

    for idx in first.into_values() {
        links[idx].is_first_commit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, span};

    fn commit(sha_char: char, minute: i64) -> GitCommit {
        GitCommit::new(sha_char.to_string().repeat(40))
            .unwrap()
            .with_timestamp(Some(at(minute)))
    }

    fn buffer() -> Duration {
        Duration::minutes(DEFAULT_BUFFER_MINUTES)
    }

    #[test]
    fn test_buffer_boundaries() {
        // Session runs 10:00..10:30
        let spans = vec![span("s1", 0, 30, 10)];

        let inside = attribute_commits(&spans, &[commit('a', 35)], buffer());
        assert_eq!(inside.assignments, vec![("a".repeat(40), "s1".to_string())]);

        let outside = attribute_commits(&spans, &[commit('b', 36)], buffer());
        assert!(outside.assignments.is_empty());

        let before = attribute_commits(&spans, &[commit('c', -5)], buffer());
        assert_eq!(before.links.len(), 1);
        assert_eq!(before.links[0].time_to_commit_seconds, 0);

        assert!(
            attribute_commits(&spans, &[commit('d', -6)], buffer())
                .links
                .is_empty()
        );
    }

    #[test]
    fn test_time_to_commit_from_session_start() {
        let spans = vec![span("s1", 0, 60, 10)];
        let result = attribute_commits(&spans, &[commit('a', 42)], buffer());
        assert_eq!(result.links[0].time_to_commit_seconds, 42 * 60);
    }

    #[test]
    fn test_overlapping_sessions_prefer_latest_start() {
        let spans = vec![
            span("early", 0, 60, 10),
            span("late", 20, 60, 10),
            span("also-late", 20, 40, 10),
        ];
        let commits = vec![commit('a', 30), commit('b', 10)];

        let result = attribute_commits(&spans, &commits, buffer());
        assert_eq!(
            result.assignments,
            vec![
                ("a".repeat(40), "also-late".to_string()),
                // 10:10 is within also-late's buffer only from 10:15 on
                ("b".repeat(40), "early".to_string()),
            ]
        );

        // Input order of spans does not matter
        let mut reversed = spans.clone();
        reversed.reverse();
        assert_eq!(attribute_commits(&reversed, &commits, buffer()), result);
    }

    #[test]
    fn test_first_commit_per_session() {
        let spans = vec![span("s1", 0, 60, 10), span("s2", 100, 160, 10)];
        let commits = vec![
            commit('c', 50),
            commit('b', 10),
            commit('a', 10),
            commit('d', 120),
        ];

        let result = attribute_commits(&spans, &commits, buffer());
        let firsts: Vec<(&str, &str)> = result
            .links
            .iter()
            .filter(|l| l.is_first_commit)
            .map(|l| (l.session_id.as_str(), &l.commit_sha[..1]))
            .collect();

        assert_eq!(firsts.len(), 2);
        assert!(firsts.contains(&("s1", "a")));
        assert!(firsts.contains(&("s2", "d")));
    }

    #[test]
    fn test_already_attributed_commits_are_skipped() {
        let spans = vec![span("s1", 0, 30, 10)];
        let done = commit('a', 10).with_session(Some("other".to_string()));
        let undated = GitCommit::new("b".repeat(40)).unwrap();

        let result = attribute_commits(&spans, &[done, undated], buffer());
        assert_eq!(result, Attribution::default());
    }
}
