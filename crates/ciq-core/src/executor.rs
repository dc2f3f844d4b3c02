//! Runs a confirmed command through the shell and captures its output.
//!
//! The command line is handed verbatim to `<shell> -c`. There is no sandbox,
//! timeout or retry: whoever confirmed the command owns what it does.
//!
//! stdin is inherited so prompting commands (`rm -i`, `read`) can still ask
//! the user. stdout and stderr are captured.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::candidate::ConfirmedCommand;
use crate::error::{CiqError, CiqResult};

/// Shell used when none is configured.
pub const DEFAULT_SHELL: &str = "sh";

/// What a finished command produced.
///
/// A non-zero exit or stderr output is not a failure of the call; both are
/// reported verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub command: String,
    pub stdout: String,
    /// `None` when the command wrote nothing to stderr.
    pub stderr: Option<String>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    /// Exit status zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawns commands through a shell.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    working_dir: Option<PathBuf>,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    /// Run commands from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Run the command once and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns `CiqError::LaunchFailure` if the shell process cannot be
    /// started. Anything after a successful spawn is reported in the outcome.
    pub async fn execute(&self, command: &ConfirmedCommand) -> CiqResult<ExecutionOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command.as_str())
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(shell = %self.shell, command = %command.as_str(), "spawning");

        let child = cmd.spawn().map_err(|e| self.launch_failure(e))?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.launch_failure(e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let outcome = ExecutionOutcome {
            command: command.as_str().to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: if stderr.is_empty() { None } else { Some(stderr) },
            exit_code: output.status.code(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        crate::obs::emit_execution_finished(
            outcome.exit_code,
            outcome.duration_ms,
            outcome.stderr.is_some(),
        );

        Ok(outcome)
    }

    fn launch_failure(&self, err: std::io::Error) -> CiqError {
        CiqError::LaunchFailure {
            shell: self.shell.clone(),
            reason: err.to_string(),
        }
    }
}
