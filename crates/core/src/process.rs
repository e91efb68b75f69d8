//! Process execution utilities
//!
//! Runs external commands (the Gradle wrapper, mostly) either capturing
//! their output or streaming it straight to the terminal. Extra environment
//! variables are added on top of the inherited environment; their values are
//! never logged.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from std::process::Output
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Run a command in a specific directory and capture its output
pub fn run_command_in_dir<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    dir: &Path,
    envs: &[(String, String)],
) -> Result<CommandResult> {
    let program = program.as_ref();
    tracing::debug!(
        program = ?program,
        dir = %dir.display(),
        env = ?env_names(envs),
        "running command"
    );

    let output = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k, v)))
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    Ok(CommandResult::from_output(output))
}

/// Run a command in a specific directory, streaming output to the terminal
///
/// Returns the exit code, or -1 when the process was killed by a signal.
pub fn run_command_streaming_in_dir<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    dir: &Path,
    envs: &[(String, String)],
) -> Result<i32> {
    let program = program.as_ref();
    tracing::debug!(
        program = ?program,
        dir = %dir.display(),
        env = ?env_names(envs),
        "running command (streaming)"
    );

    let status = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k, v)))
        .current_dir(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, e))?;

    Ok(status.code().unwrap_or(-1))
}

fn env_names(envs: &[(String, String)]) -> Vec<&str> {
    envs.iter().map(|(k, _)| k.as_str()).collect()
}

fn spawn_error(program: &OsStr, err: std::io::Error) -> Error {
    let name = program.to_string_lossy();
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::command_not_found(&name).with_source(err)
    } else {
        Error::process(format!("Failed to execute {}: {}", name, err)).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[cfg(unix)]
    #[test]
    fn test_run_command_in_dir_echo() {
        let dir = std::env::temp_dir();
        let result = run_command_in_dir("echo", &["hello"], &dir, &[]).unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_streaming_exit_code() {
        let dir = std::env::temp_dir();
        let code = run_command_streaming_in_dir("sh", &["-c", "exit 3"], &dir, &[]).unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_reaches_child_not_argv() {
        let dir = std::env::temp_dir();
        let envs = vec![(
            "ORG_GRADLE_PROJECT_android.injected.signing.store.password".to_string(),
            "s3cret".to_string(),
        )];
        let no_args: [&str; 0] = [];

        let result = run_command_in_dir("env", &no_args, &dir, &envs).unwrap();

        assert!(result.success);
        assert!(result
            .stdout
            .lines()
            .any(|l| l == "ORG_GRADLE_PROJECT_android.injected.signing.store.password=s3cret"));
    }

    #[test]
    fn test_missing_program() {
        let dir = std::env::temp_dir();
        let err = run_command_in_dir("nonexistent_command_12345", &["x"], &dir, &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandNotFound);
    }

    #[test]
    fn test_command_result_combined_output() {
        let result = CommandResult {
            success: true,
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert!(result.combined_output().contains("out"));
        assert!(result.combined_output().contains("err"));
    }
}
