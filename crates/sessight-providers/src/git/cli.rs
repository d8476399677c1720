use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CommitSource, GitError, LOG_FORMAT};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs the `git` binary with a hard timeout.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git", Duration::from_secs(30))
    }
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Run the binary with `args` in `repo`, returning stdout.
    pub fn run(&self, repo: &Path, args: &[String]) -> Result<String, GitError> {
        let mut child = Command::new(&self.binary)
            .arg("-C")
            .arg(repo)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(GitError::Spawn)?;

        // Drain both pipes so a chatty child cannot block on a full buffer
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(GitError::Spawn)? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join(stdout);
        let stderr = join(stderr);
        debug!(
            binary = %self.binary.display(),
            code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git finished"
        );

        if status.success() {
            return Ok(stdout);
        }
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepository(repo.to_path_buf()));
        }
        Err(GitError::Exit {
            code: status.code(),
            stderr,
        })
    }
}

impl CommitSource for GitCli {
    fn log(&self, repo: &Path, days: u32) -> Result<String, GitError> {
        if !repo.is_dir() {
            return Err(GitError::NotARepository(repo.to_path_buf()));
        }
        self.run(
            repo,
            &[
                "log".to_string(),
                format!("--since={} days ago", days),
                format!("--format={}", LOG_FORMAT),
            ],
        )
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let git = GitCli::new("/nonexistent/git-binary", Duration::from_secs(5));
        let err = git.log(dir.path(), 7).unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)), "{err}");
    }

    #[test]
    fn test_missing_directory_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let err = GitCli::default()
            .log(&dir.path().join("gone"), 7)
            .unwrap_err();
        assert!(matches!(err, GitError::NotARepository(_)));
    }

    #[test]
    fn test_slow_child_is_killed_at_timeout() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("slow-git");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let git = GitCli::new(&script, Duration::from_millis(200));
        let started = Instant::now();
        let err = git.log(dir.path(), 7).unwrap_err();

        assert!(matches!(err, GitError::Timeout(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("failing-git");
        std::fs::write(&script, "#!/bin/sh\necho 'fatal: bad revision' >&2\nexit 128\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let err = GitCli::new(&script, Duration::from_secs(5))
            .log(dir.path(), 7)
            .unwrap_err();
        match err {
            GitError::Exit { code, stderr } => {
                assert_eq!(code, Some(128));
                assert!(stderr.contains("bad revision"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
