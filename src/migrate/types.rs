use crate::external::{CommandError, GitHubError};
use crate::workflow::outcome::{Classify, FailureClass};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_SOURCE_BRANCH: &str = "main";
pub const DEFAULT_TARGET_BRANCH: &str = "master";
pub const DEFAULT_WORKFLOWS_DIRECTORY: &str = ".github/workflows";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub repository_path: PathBuf,
    pub repository_remote: String,
    /// GitHub `owner/repo`
    pub repository_identifier: String,
    pub workflows_directory: String,
    pub source_branch: String,
    pub target_branch: String,
    pub push_updates: bool,
}

impl MigrationOptions {
    pub fn validate(&self) -> Result<(), MigrationError> {
        let required = |field: &'static str, value: &str| {
            if value.trim().is_empty() {
                Err(MigrationError::InvalidInput {
                    field,
                    reason: "required".to_string(),
                })
            } else {
                Ok(())
            }
        };
        required("repository_path", &self.repository_path.to_string_lossy())?;
        required("repository_remote", &self.repository_remote)?;
        required("repository_identifier", &self.repository_identifier)?;
        required("workflows_directory", &self.workflows_directory)?;
        required("source_branch", &self.source_branch)?;
        required("target_branch", &self.target_branch)?;
        if self.source_branch.trim() == self.target_branch.trim() {
            return Err(MigrationError::InvalidInput {
                field: "target_branch",
                reason: "must differ from source_branch".to_string(),
            });
        }
        Ok(())
    }

    pub fn workflows_path(&self) -> PathBuf {
        self.repository_path.join(&self.workflows_directory)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyInputs {
    pub open_pull_requests: usize,
    pub branch_protected: bool,
    pub workflow_mentions_remain: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyStatus {
    pub safe_to_delete: bool,
    pub blocking_reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationResult {
    pub updated_workflow_files: Vec<PathBuf>,
    pub remaining_main_references: bool,
    pub workflow_commit_created: bool,
    pub workflow_changes_pushed: bool,
    pub pages_configuration_updated: bool,
    pub default_branch_updated: bool,
    pub retargeted_pull_requests: Vec<u64>,
    pub safety_status: SafetyStatus,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid migration input {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("repository {} has uncommitted changes", path.display())]
    DirtyWorktree { path: PathBuf },
    #[error("failed to rewrite workflows in {}: {source}", path.display())]
    WorkflowRewrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("git command failed: {0}")]
    Git(#[from] CommandError),
    #[error(
        "failed to update default branch for {repository_identifier} ({}) from {source_branch} to {target_branch}: {message}",
        repository_path.display()
    )]
    DefaultBranchUpdate {
        repository_path: PathBuf,
        repository_identifier: String,
        source_branch: String,
        target_branch: String,
        message: String,
        #[source]
        source: GitHubError,
    },
    #[error("failed to list open pull requests for {repository}: {source}")]
    PullRequestList {
        repository: String,
        #[source]
        source: GitHubError,
    },
    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

impl MigrationError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            MigrationError::Git(e) => e.is_cancelled(),
            MigrationError::GitHub(e)
            | MigrationError::DefaultBranchUpdate { source: e, .. }
            | MigrationError::PullRequestList { source: e, .. } => e.is_cancelled(),
            _ => false,
        }
    }
}

impl Classify for MigrationError {
    fn failure_class(&self) -> FailureClass {
        FailureClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MigrationOptions {
        MigrationOptions {
            repository_path: PathBuf::from("/work/demo"),
            repository_remote: DEFAULT_REMOTE.to_string(),
            repository_identifier: "octo/demo".to_string(),
            workflows_directory: DEFAULT_WORKFLOWS_DIRECTORY.to_string(),
            source_branch: DEFAULT_SOURCE_BRANCH.to_string(),
            target_branch: DEFAULT_TARGET_BRANCH.to_string(),
            push_updates: true,
        }
    }

    #[test]
    fn test_required_fields() {
        options().validate().unwrap();

        let mut missing = options();
        missing.repository_identifier = " ".to_string();
        assert!(matches!(
            missing.validate(),
            Err(MigrationError::InvalidInput {
                field: "repository_identifier",
                ..
            })
        ));

        let mut same = options();
        same.target_branch = "main".to_string();
        assert!(matches!(
            same.validate(),
            Err(MigrationError::InvalidInput { field: "target_branch", .. })
        ));
    }
}
