//! Single-repository leaf operations
//!
//! Each function performs one mutation on one repository and reports
//! repository-scoped problems as `OperationError`, which callers may skip
//! past. Anything else (cancellation, a missing git binary) is fatal.

pub mod canonical;
pub mod protocol;
pub mod release;
pub mod remotes;
pub mod rename;

use crate::external::CommandError;
use crate::workflow::outcome::{Classify, FailureClass};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationErrorKind {
    TargetExists,
    CommandFailed,
    Io,
    RenameNotApplied,
    InvalidRemote,
    TagExists,
}

#[derive(Debug, Error)]
#[error("{operation} failed for {}: {message}", path.display())]
pub struct OperationError {
    pub operation: String,
    pub path: PathBuf,
    pub kind: OperationErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(operation: &str, path: &Path, kind: OperationErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            path: path.to_path_buf(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryOperationError {
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl RepositoryOperationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepositoryOperationError::Command(e) if e.is_cancelled())
    }
}

impl Classify for RepositoryOperationError {
    fn failure_class(&self) -> FailureClass {
        match self {
            RepositoryOperationError::Operation(_) => FailureClass::Recoverable,
            RepositoryOperationError::Command(_) => FailureClass::Fatal,
        }
    }
}

/// A git command that ran and failed is the repository's problem; anything
/// else stays a command error.
pub(crate) fn git_failure(operation: &str, path: &Path, error: CommandError) -> RepositoryOperationError {
    match error {
        CommandError::Failed { ref stderr, .. } => {
            let message = if stderr.trim().is_empty() {
                error.to_string()
            } else {
                stderr.trim().to_string()
            };
            OperationError::new(operation, path, OperationErrorKind::CommandFailed, message).into()
        }
        other => RepositoryOperationError::Command(other),
    }
}

pub(crate) fn io_failure(operation: &str, path: &Path, context: &str, error: std::io::Error) -> RepositoryOperationError {
    OperationError::new(operation, path, OperationErrorKind::Io, format!("{context}: {error}")).into()
}
