use serde::Serialize;
use sessight_types::GitCommit;
use tracing::debug;

use crate::time::parse_timestamp;

/// `git log` format consumed by [`parse_git_log`]: sha, author, ISO date,
/// subject.
pub const LOG_FORMAT: &str = "%H|%an|%aI|%s";

/// Commits parsed from `git log` output plus what had to be skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLog {
    pub commits: Vec<GitCommit>,
    /// Non-empty lines in the output
    pub found: usize,
    /// Lines with fewer than four fields
    pub skipped_malformed: usize,
    pub skipped_date_parse: usize,
    pub skipped_invalid_sha: usize,
}

/// Parse output produced with [`LOG_FORMAT`].
///
/// The subject is the last field and may itself contain `|`. Commit dates are
/// normalized to UTC.
pub fn parse_git_log(output: &str, project: Option<&str>) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        parsed.found += 1;

        let fields: Vec<&str> = line.splitn(4, '|').collect();
        let [sha, author, date, subject] = fields.as_slice() else {
            debug!(line, "skipping malformed git log line");
            parsed.skipped_malformed += 1;
            continue;
        };

        let Some(timestamp) = parse_timestamp(date) else {
            debug!(sha, date, "skipping commit with unparsable date");
            parsed.skipped_date_parse += 1;
            continue;
        };

        let commit = match GitCommit::new(sha.trim()) {
            Ok(commit) => commit,
            Err(err) => {
                debug!(sha, error = %err, "skipping commit with invalid sha");
                parsed.skipped_invalid_sha += 1;
                continue;
            }
        };

        parsed.commits.push(
            commit
                .with_timestamp(Some(timestamp))
                .with_author(non_empty(author))
                .with_message(non_empty(subject))
                .with_project(project.map(str::to_string)),
        );
    }

    parsed
}

fn non_empty(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SHA: &str = "4f2c9a1b7e3d5f60718293a4b5c6d7e8f9012345";

    #[test]
    fn test_well_formed_line() {
        let output = format!("{}|Ada Lovelace|2025-01-15T12:30:00+02:00|Fix parser\n", SHA);
        let parsed = parse_git_log(&output, Some("app"));

        assert_eq!(parsed.found, 1);
        assert_eq!(parsed.commits.len(), 1);
        let commit = &parsed.commits[0];
        assert_eq!(commit.sha(), SHA);
        assert_eq!(commit.author(), Some("Ada Lovelace"));
        assert_eq!(commit.message(), Some("Fix parser"));
        assert_eq!(commit.project_path(), Some("app"));
        assert_eq!(
            commit.timestamp(),
            NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
        );
        assert_eq!(commit.session_id(), None);
    }

    #[test]
    fn test_subject_may_contain_pipes() {
        let output = format!("{}|dev|2025-01-15T10:00:00Z|a | b | c", SHA);
        let parsed = parse_git_log(&output, None);
        assert_eq!(parsed.commits[0].message(), Some("a | b | c"));
    }

    #[test]
    fn test_skips_are_counted_by_reason() {
        let output = format!(
            "{sha}|dev|2025-01-15T10:00:00Z|ok\n\
             only|three|fields\n\
             {sha}|dev|last tuesday|bad date\n\
             zzzzzzz|dev|2025-01-15T10:00:00Z|bad sha\n\
             \n",
            sha = SHA
        );
        let parsed = parse_git_log(&output, None);

        assert_eq!(parsed.found, 4);
        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(parsed.skipped_malformed, 1);
        assert_eq!(parsed.skipped_date_parse, 1);
        assert_eq!(parsed.skipped_invalid_sha, 1);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_git_log("", None), ParsedLog::default());
    }
}
