//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing. Every execution observes a cancellation
//! token so a cancelled run stops at the next process boundary.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDetails {
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
}

impl CommandDetails {
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            working_directory: None,
            environment: BTreeMap::new(),
        }
    }

    pub fn in_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.environment.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{program} {arguments} exited with status {status_code}: {stderr}")]
    Failed {
        program: String,
        arguments: String,
        status_code: i32,
        stdout: String,
        stderr: String,
    },
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("IO error: {message}")]
    Io { message: String },
    #[error("command cancelled: {command}")]
    Cancelled { command: String },
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }

    /// Combined stdout and stderr of a failed command, used to sniff for
    /// well-known git and gh messages.
    pub fn output_text(&self) -> String {
        match self {
            CommandError::Failed { stdout, stderr, .. } => format!("{stdout}\n{stderr}"),
            other => other.to_string(),
        }
    }
}

/// Trait for executing external commands
///
/// Implementations return the raw output regardless of exit status; callers
/// decide what a non-zero status means.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &CancellationToken,
        program: &str,
        details: &CommandDetails,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using tokio::process::Command
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        ctx: &CancellationToken,
        program: &str,
        details: &CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        let rendered = format!("{} {}", program, details.arguments.join(" "));
        if ctx.is_cancelled() {
            return Err(CommandError::Cancelled { command: rendered });
        }

        let mut command = tokio::process::Command::new(program);
        command.args(&details.arguments).kill_on_drop(true);
        if let Some(directory) = &details.working_directory {
            command.current_dir(directory);
        }
        for (key, value) in &details.environment {
            command.env(key, value);
        }

        tracing::debug!(command = %rendered, "executing external command");

        let output = tokio::select! {
            _ = ctx.cancelled() => {
                return Err(CommandError::Cancelled { command: rendered });
            }
            output = command.output() => output,
        };

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::CommandNotFound {
                    command: program.to_string(),
                }
            } else {
                CommandError::Io { message: e.to_string() }
            }
        })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
