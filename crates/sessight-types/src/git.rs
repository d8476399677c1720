use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{Error, Result};

const MIN_SHA_LEN: usize = 7;
const MAX_SHA_LEN: usize = 40;

/// A commit observed in a repository's history.
///
/// The SHA is validated on construction. `session_id` stays empty until
/// correlation attributes the commit to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitCommit {
    sha: String,
    timestamp: Option<NaiveDateTime>,
    author: Option<String>,
    message: Option<String>,
    project_path: Option<String>,
    session_id: Option<String>,
}

impl GitCommit {
    pub fn new(sha: impl Into<String>) -> Result<Self> {
        let sha = sha.into();
        validate_sha(&sha)?;
        Ok(Self {
            sha,
            timestamp: None,
            author: None,
            message: None,
            project_path: None,
            session_id: None,
        })
    }

    pub fn with_timestamp(mut self, timestamp: Option<NaiveDateTime>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_project(mut self, project_path: Option<String>) -> Self {
        self.project_path = project_path;
        self
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn sha(&self) -> &str {
        &self.sha
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn project_path(&self) -> Option<&str> {
        self.project_path.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

fn validate_sha(sha: &str) -> Result<()> {
    if sha.is_empty() {
        return Err(Error::InvalidSha("SHA cannot be empty".to_string()));
    }
    if !(MIN_SHA_LEN..=MAX_SHA_LEN).contains(&sha.len()) {
        return Err(Error::InvalidSha(format!(
            "SHA must be {}-{} characters, got {}",
            MIN_SHA_LEN,
            MAX_SHA_LEN,
            sha.len()
        )));
    }
    if !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidSha(format!(
            "SHA must be hexadecimal: {}",
            sha
        )));
    }
    Ok(())
}

/// Attribution of a commit to the session it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCommit {
    pub session_id: String,
    pub commit_sha: String,
    /// Seconds from session start to the commit, never negative
    pub time_to_commit_seconds: i64,
    pub is_first_commit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha_length_bounds() {
        assert!(GitCommit::new("abc123").is_err());
        assert!(GitCommit::new("abc1234").is_ok());
        assert!(GitCommit::new("a".repeat(40)).is_ok());
        assert!(GitCommit::new("a".repeat(41)).is_err());
    }

    #[test]
    fn test_sha_rejects_empty_and_non_hex() {
        let empty = GitCommit::new("").unwrap_err();
        assert!(empty.to_string().contains("cannot be empty"));

        let non_hex = GitCommit::new("xyz12345").unwrap_err();
        assert!(non_hex.to_string().contains("must be hexadecimal"));

        let short = GitCommit::new("abc").unwrap_err();
        assert!(short.to_string().contains("must be 7-40 characters"));
    }

    #[test]
    fn test_sha_accepts_mixed_case_hex() {
        let commit = GitCommit::new("DeadBeef42").unwrap();
        assert_eq!(commit.sha(), "DeadBeef42");
        assert_eq!(commit.session_id(), None);
    }
}
