//! Child process invocation.
//!
//! Two execution modes: `output` captures stdout/stderr for short queries,
//! `status` inherits the parent's stdio for long-running tool runs whose
//! progress the operator watches (docker build, docker push, poetry update).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error};

/// Errors from running an external tool.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}")]
    NonZero { command: String, status: i32 },

    #[error("`{command}` timed out after {limit_secs}s")]
    TimedOut { command: String, limit_secs: u64 },
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// A single external tool invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    limit: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            limit: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Bound the captured run; only applies to [`Invocation::output`].
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The full command line, for logs and errors.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Run with captured output. A non-zero exit is an error; stderr is
    /// logged before the error is returned.
    pub async fn output(&self) -> Result<String> {
        let command_line = self.command_line();
        debug!(command = %command_line, "Running (captured)");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let run = cmd.output();
        let output = match self.limit {
            Some(limit) => timeout(limit, run).await.map_err(|_| CommandError::TimedOut {
                command: command_line.clone(),
                limit_secs: limit.as_secs(),
            })?,
            None => run.await,
        }
        .map_err(|source| CommandError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            error!(
                command = %command_line,
                status,
                stderr = %stderr_tail(&output.stderr),
                "Command failed"
            );
            return Err(CommandError::NonZero {
                command: command_line,
                status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run attached to the parent's stdio. Used for tool runs the operator
    /// watches; their own output is the progress report.
    pub async fn status(&self) -> Result<()> {
        let command_line = self.command_line();
        debug!(command = %command_line, "Running (inherited stdio)");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let status = cmd.status().await.map_err(|source| CommandError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if !status.success() {
            return Err(CommandError::NonZero {
                command: command_line,
                status: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

/// Last chunk of stderr, enough to diagnose without flooding the log.
fn stderr_tail(raw: &[u8]) -> String {
    const MAX: usize = 2000;
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut start = text.len() - MAX;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("... {}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_formatting() {
        let inv = Invocation::new("docker").args(["images", "-q", "tag:latest"]);
        assert_eq!(inv.command_line(), "docker images -q tag:latest");

        let bare = Invocation::new("docker");
        assert_eq!(bare.command_line(), "docker");
    }

    #[tokio::test]
    async fn test_output_captures_stdout() {
        let out = Invocation::new("sh")
            .args(["-c", "printf hello"])
            .output()
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_output_nonzero_exit_is_error() {
        let err = Invocation::new("sh")
            .args(["-c", "exit 3"])
            .output()
            .await
            .unwrap_err();
        match err {
            CommandError::NonZero { status, .. } => assert_eq!(status, 3),
            other => panic!("expected NonZero, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_output_times_out() {
        let err = Invocation::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = Invocation::new("definitely-not-a-real-binary-1c4a")
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_status_success() {
        Invocation::new("true").status().await.unwrap();
    }

    #[test]
    fn test_stderr_tail_truncates() {
        let long = "x".repeat(5000);
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.len() < 2100);
        assert!(tail.starts_with("... "));
    }
}
