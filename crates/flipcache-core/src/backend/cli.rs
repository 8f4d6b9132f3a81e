use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Backend, BackendCommand, BackendError};

/// Runs the tracker CLI as a child process per call.
#[derive(Debug, Clone)]
pub struct CliBackend {
    program: String,
    /// Arguments placed before every command (e.g. `-m src.cli`).
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CliBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

#[async_trait]
impl Backend for CliBackend {
    async fn call(&self, command: &BackendCommand) -> Result<String, BackendError> {
        debug!(program = %self.program, command = %command, "Running backend command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(&command.argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BackendError::Unreachable(format!("{}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            return Ok(stdout.into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let err = BackendError::from_output(&stderr, &stdout);
        warn!(command = %command, status = ?output.status.code(), error = %err, "Backend command failed");
        Err(err)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_returned_on_success() {
        let backend = CliBackend::new("echo");
        let out = backend.call(&BackendCommand::list_projects()).await.unwrap();
        assert_eq!(out.trim(), "project list");
    }

    #[tokio::test]
    async fn test_base_args_and_working_dir() {
        let backend = CliBackend::new("sh")
            .with_args(vec!["-c".to_string(), "pwd".to_string()])
            .with_working_dir(Some(PathBuf::from("/")));
        let out = backend.call(&BackendCommand::list_projects()).await.unwrap();
        assert_eq!(out.trim(), "/");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let backend = CliBackend::new("sh").with_args(vec![
            "-c".to_string(),
            "echo 'ERROR: Project 9 not found' >&2; exit 1".to_string(),
        ]);
        let err = backend.call(&BackendCommand::list_projects()).await.unwrap_err();
        assert_eq!(err, BackendError::CommandFailed("ERROR: Project 9 not found".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program_is_unreachable() {
        let backend = CliBackend::new("flipcache-no-such-program");
        let err = backend.call(&BackendCommand::list_projects()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable(_)));
    }
}
