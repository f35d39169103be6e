//! External process execution.
//!
//! Every collaborator executable (tar, git, dpkg, gh) is invoked through the
//! [`Executor`] trait so pipeline code can be exercised in tests with
//! scripted implementations. Checked runs log the child's stderr at error
//! severity before the failure propagates as a [`BuildError`].

use std::path::Path;
use std::process::{Command, Output};

use tracing::error;

use crate::error::BuildError;

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over external process execution.
pub trait Executor {
    /// Run a command and return its output. Fails if the command exits
    /// non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult, BuildError>;

    /// Run a command in a specific working directory.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult, BuildError>;

    /// Run a command in a specific working directory with extra environment
    /// variables set on the child only.
    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult, BuildError>;

    /// Check whether a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Paths handed to child processes as arguments must be valid unicode.
pub(crate) fn path_str(path: &Path) -> Result<&str, BuildError> {
    path.to_str()
        .ok_or_else(|| BuildError::Stage(format!("non-unicode path {}", path.display())))
}

/// [`Executor`] implementation backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn spawn(mut cmd: Command, program: &str) -> Result<ExecResult, BuildError> {
        let output = cmd.output().map_err(|source| BuildError::Spawn {
            program: program.to_string(),
            source,
        })?;
        Ok(ExecResult::from(output))
    }

    fn checked(cmd: Command, program: &str) -> Result<ExecResult, BuildError> {
        let result = Self::spawn(cmd, program)?;
        if result.success {
            Ok(result)
        } else {
            let stderr = result.stderr.trim().to_string();
            if !stderr.is_empty() {
                error!("{stderr}");
            }
            Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: result.code.unwrap_or(-1),
                stderr,
            })
        }
    }
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult, BuildError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::checked(cmd, program)
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult, BuildError> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        Self::checked(cmd, program)
    }

    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult, BuildError> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        for (k, v) in env {
            cmd.env(k, v);
        }
        Self::checked(cmd, program)
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
