//! Declarative repository tasks
//!
//! A task renders its templates against one repository, diffs the result
//! against the worktree (`TaskPlanner`), and applies the plan on a fresh
//! branch (`TaskExecutor`): checkout, write, add, commit, push, optionally
//! open a pull request, then return to the branch it started from.

pub mod definition;
pub mod executor;
pub mod planner;
pub mod template;

use crate::external::{CommandError, GitHubError};
use crate::workflow::outcome::{Classify, FailureClass};
use std::path::PathBuf;
use thiserror::Error;

pub use definition::{
    FileMode, TaskBranchDefinition, TaskCommitDefinition, TaskDefinition, TaskFileDefinition,
    TaskPullRequestDefinition,
};
pub use executor::{TaskExecutor, TaskOutcome};
pub use planner::{FileChange, TaskPlan, TaskPlanner};
pub use template::{slugify_branch, TemplateData, TemplateRenderer};

pub const SKIP_REASON_NO_CHANGES: &str = "no changes";
pub const SKIP_REASON_UNCHANGED: &str = "unchanged";
pub const SKIP_REASON_EXISTS: &str = "exists";

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to render {field} template: {message}")]
    Template { field: String, message: String },
    #[error("rendered file path '{path}' is invalid: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("repository {} has no default or local branch to start from", path.display())]
    MissingStartPoint { path: PathBuf },
    #[error("repository {} has uncommitted changes", path.display())]
    DirtyWorktree { path: PathBuf },
    #[error(transparent)]
    Git(#[from] CommandError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open pull request: {0}")]
    PullRequest(#[from] GitHubError),
    #[error("repository {} has no GitHub identifier for a pull request", path.display())]
    MissingRepositoryIdentifier { path: PathBuf },
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            TaskError::Git(e) => e.is_cancelled(),
            TaskError::PullRequest(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

impl Classify for TaskError {
    fn failure_class(&self) -> FailureClass {
        if self.is_cancelled() {
            FailureClass::Fatal
        } else {
            FailureClass::Recoverable
        }
    }
}
