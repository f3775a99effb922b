use std::path::PathBuf;
use thiserror::Error;

/// Problems with the workflow document, reported before any repository is touched
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read workflow configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse workflow configuration: {message}")]
    Parse { message: String },
    #[error("workflow configuration declares no steps")]
    EmptySteps,
    #[error("workflow step {index} is missing an operation")]
    MissingOperation { index: usize },
    #[error("workflow tool '{name}' is declared more than once")]
    DuplicateTool { name: String },
    #[error("workflow tool '{name}' is missing an operation")]
    EmptyToolOperation { name: String },
    #[error("workflow tool '{tool_name}' not found")]
    ToolReferenceNotFound { tool_name: String },
    #[error("workflow step operation '{step_operation}' conflicts with tool '{tool_name}' operation '{tool_operation}'")]
    OperationMismatch {
        step_operation: String,
        tool_name: String,
        tool_operation: String,
    },
    #[error("unsupported workflow operation '{operation}'")]
    UnsupportedOperation { operation: String },
    #[error("invalid options for {operation}: {message}")]
    InvalidOptions { operation: String, message: String },
}

impl ConfigurationError {
    pub fn invalid(operation: &str, message: impl Into<String>) -> Self {
        ConfigurationError::InvalidOptions {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow executor requires a {0}")]
    MissingCollaborator(&'static str),
    #[error("failed to resolve workflow roots: {0}")]
    Sanitize(#[source] std::io::Error),
    #[error("repository discovery failed: {0:#}")]
    Discovery(#[source] anyhow::Error),
    #[error("workflow operation {name} failed: {source:#}")]
    OperationFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}
