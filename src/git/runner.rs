//! Runs the external `git` binary inside a mirror's working directory.
//!
//! Commands execute with a cleared environment so host credentials can never
//! leak into a fetch. Stderr is streamed line-by-line into the operation
//! sink while a bounded excerpt is retained for error reporting. Stdout
//! either joins the sink (administrative commands) or is written
//! byte-for-byte to a supplied buffer (commands whose stdout is the
//! response, e.g. `bundle create -`).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::errors::ProxyError;
use crate::ops::RunningOperation;

/// Upper bound on the stderr excerpt kept for `CommandFailed` errors.
const STDERR_EXCERPT_LIMIT: usize = 4096;

/// Locate the `git` binary by scanning `PATH`. Absence is fatal at startup.
pub fn locate_git_binary() -> anyhow::Result<PathBuf> {
    let path_var =
        std::env::var_os("PATH").ok_or_else(|| anyhow!("PATH environment variable is not set"))?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join("git");
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(anyhow!("cannot find the git binary on PATH"))
}

// ---------------------------------------------------------------------------
// GitRunner
// ---------------------------------------------------------------------------

/// Invokes `git` with a fixed binary path resolved once at startup.
#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: PathBuf,
}

impl GitRunner {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Absolute path of the `git` binary.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, dir: &Path, auth: Option<&str>, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(auth) = auth {
            cmd.arg("-c")
                .arg(format!("http.extraHeader=Authorization: {auth}"));
        }
        cmd.args(args);
        cmd.env_clear();
        cmd.current_dir(dir);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(false);
        cmd
    }

    /// Administrative command: stdout and stderr both stream into the
    /// operation sink.
    pub async fn run(
        &self,
        op: &dyn RunningOperation,
        dir: &Path,
        auth: Option<&str>,
        args: &[&str],
    ) -> Result<(), ProxyError> {
        debug!(?args, dir = %dir.display(), "running git");
        let mut cmd = self.command(dir, auth, args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ProxyError::Internal(anyhow!("failed to spawn git: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("git stdout pipe missing")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("git stderr pipe missing")))?;

        let (excerpt, ()) = tokio::join!(
            pump_lines(stderr, op, true),
            async {
                pump_lines(stdout, op, false).await;
            }
        );

        let status = child
            .wait()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("failed to wait on git: {e}")))?;
        if !status.success() {
            return Err(ProxyError::CommandFailed {
                command: args.join(" "),
                status,
                stderr: excerpt,
            });
        }
        Ok(())
    }

    /// Streamed command: stdout is appended byte-for-byte to `out`, stderr
    /// goes to the operation sink.
    pub async fn run_with_stdout(
        &self,
        op: &dyn RunningOperation,
        out: &mut Vec<u8>,
        dir: &Path,
        auth: Option<&str>,
        args: &[&str],
    ) -> Result<(), ProxyError> {
        debug!(?args, dir = %dir.display(), "running git with captured stdout");
        let mut cmd = self.command(dir, auth, args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ProxyError::Internal(anyhow!("failed to spawn git: {e}")))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("git stdout pipe missing")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("git stderr pipe missing")))?;

        let (excerpt, read) = tokio::join!(pump_lines(stderr, op, true), async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });
        let buf =
            read.map_err(|e| ProxyError::Internal(anyhow!("failed to read git stdout: {e}")))?;

        let status = child
            .wait()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("failed to wait on git: {e}")))?;
        if !status.success() {
            return Err(ProxyError::CommandFailed {
                command: args.join(" "),
                status,
                stderr: excerpt,
            });
        }
        out.extend_from_slice(&buf);
        Ok(())
    }

    /// Capture-stdout lookup. `Ok(Some(stdout))` on success, `Ok(None)` when
    /// git exits with status 1 (a lookup miss: unknown ref or missing
    /// object), `Err` for anything else.
    pub async fn query(&self, dir: &Path, args: &[&str]) -> Result<Option<String>, ProxyError> {
        let mut cmd = self.command(dir, None, args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("failed to spawn git: {e}")))?;

        if output.status.success() {
            return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
        }
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        Err(ProxyError::CommandFailed {
            command: args.join(" "),
            status: output.status,
            stderr: truncate_excerpt(&String::from_utf8_lossy(&output.stderr)),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Stream lines from a subprocess pipe into the operation sink, optionally
/// retaining a bounded excerpt.
async fn pump_lines(
    reader: impl AsyncRead + Unpin,
    op: &dyn RunningOperation,
    keep_excerpt: bool,
) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut excerpt = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        op.progress(&line);
        if keep_excerpt && excerpt.len() < STDERR_EXCERPT_LIMIT {
            excerpt.push_str(&line);
            excerpt.push('\n');
        }
    }
    excerpt
}

fn truncate_excerpt(s: &str) -> String {
    if s.len() <= STDERR_EXCERPT_LIMIT {
        s.to_string()
    } else {
        let mut end = STDERR_EXCERPT_LIMIT;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::NoopOperation;

    #[test]
    fn locate_git_finds_a_binary() {
        // `git` is a hard requirement of this crate; CI without it cannot
        // run the subprocess tests either.
        let path = locate_git_binary().unwrap();
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn run_reports_failure_with_excerpt() {
        let runner = GitRunner::new(locate_git_binary().unwrap());
        let tmp = tempfile::tempdir().unwrap();
        let err = runner
            .run(&NoopOperation, tmp.path(), None, &["no-such-subcommand"])
            .await
            .unwrap_err();
        match err {
            ProxyError::CommandFailed { command, .. } => {
                assert_eq!(command, "no-such-subcommand");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_distinguishes_miss_from_error() {
        let runner = GitRunner::new(locate_git_binary().unwrap());
        let tmp = tempfile::tempdir().unwrap();
        runner
            .run(&NoopOperation, tmp.path(), None, &["init", "--bare"])
            .await
            .unwrap();

        // Missing object: exit status 1, reported as a miss.
        let miss = runner
            .query(
                tmp.path(),
                &["cat-file", "-e", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"],
            )
            .await
            .unwrap();
        assert!(miss.is_none());

        // Unknown subcommand: a real error.
        assert!(runner.query(tmp.path(), &["no-such-subcommand"]).await.is_err());
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(STDERR_EXCERPT_LIMIT);
        let excerpt = truncate_excerpt(&long);
        assert!(excerpt.len() <= STDERR_EXCERPT_LIMIT);
    }
}
