//! Failure policy for per-repository work
//!
//! Every domain error declares how far it may travel: advisory failures and
//! recoverable repository failures become warning lines, fatal ones abort the
//! operation. Cancellation anywhere in the chain is always fatal.

use super::state::Environment;
use crate::external::{CommandError, GitHubError};
use crate::migrate::MigrationError;
use crate::repos::{OperationError, RepositoryOperationError};
use crate::tasks::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Best-effort step failed; the surrounding work still succeeds
    Advisory,
    /// One repository failed; continue with the next
    Recoverable,
    /// Abort the operation and the run
    Fatal,
}

pub trait Classify {
    fn failure_class(&self) -> FailureClass;
}

impl Classify for CommandError {
    fn failure_class(&self) -> FailureClass {
        FailureClass::Fatal
    }
}

impl Classify for GitHubError {
    fn failure_class(&self) -> FailureClass {
        if self.is_cancelled() {
            FailureClass::Fatal
        } else {
            FailureClass::Advisory
        }
    }
}

impl Classify for OperationError {
    fn failure_class(&self) -> FailureClass {
        FailureClass::Recoverable
    }
}

/// True when any error in the chain is, or transparently wraps, a cancelled command
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<CommandError>()
            .is_some_and(CommandError::is_cancelled)
            || cause.downcast_ref::<GitHubError>().is_some_and(GitHubError::is_cancelled)
            || cause.downcast_ref::<TaskError>().is_some_and(TaskError::is_cancelled)
            || cause
                .downcast_ref::<RepositoryOperationError>()
                .is_some_and(RepositoryOperationError::is_cancelled)
            || cause.downcast_ref::<MigrationError>().is_some_and(MigrationError::is_cancelled)
    })
}

/// Classify an opaque error by the first domain error found in its chain
pub fn classify(error: &anyhow::Error) -> FailureClass {
    if is_cancellation(error) {
        return FailureClass::Fatal;
    }
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<RepositoryOperationError>() {
            return e.failure_class();
        }
        if let Some(e) = cause.downcast_ref::<OperationError>() {
            return e.failure_class();
        }
        if let Some(e) = cause.downcast_ref::<TaskError>() {
            return e.failure_class();
        }
        if let Some(e) = cause.downcast_ref::<MigrationError>() {
            return e.failure_class();
        }
        if let Some(e) = cause.downcast_ref::<GitHubError>() {
            return e.failure_class();
        }
        if let Some(e) = cause.downcast_ref::<CommandError>() {
            return e.failure_class();
        }
    }
    FailureClass::Fatal
}

/// Print non-fatal failures as `<label>: <error>` on the error sink and keep
/// going; hand fatal ones back to the caller.
pub fn handle_repository_failure(env: &Environment, label: &str, error: anyhow::Error) -> anyhow::Result<()> {
    match classify(&error) {
        FailureClass::Advisory | FailureClass::Recoverable => {
            env.warn(format!("{label}: {error:#}"));
            Ok(())
        }
        FailureClass::Fatal => Err(error),
    }
}
