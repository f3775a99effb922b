//! Git command abstractions
//!
//! `GitExecutor` is the single seam through which the engine reaches the
//! `git` and `gh` binaries. `RepositoryManager` layers the handful of typed
//! repository queries the operations need on top of it.

use super::command::{CommandDetails, CommandError, CommandExecutor, CommandOutput};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes `git` and `gh` invocations. A non-zero exit status is reported
/// as `CommandError::Failed`.
#[async_trait]
pub trait GitExecutor: Send + Sync {
    async fn execute_git(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError>;

    async fn execute_github_cli(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real executor shelling out through a `CommandExecutor`
pub struct ShellGitExecutor {
    executor: Arc<dyn CommandExecutor>,
    git_binary: String,
    github_binary: String,
}

impl ShellGitExecutor {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            git_binary: "git".to_string(),
            github_binary: "gh".to_string(),
        }
    }

    pub fn with_binaries(mut self, git_binary: &str, github_binary: &str) -> Self {
        self.git_binary = git_binary.to_string();
        self.github_binary = github_binary.to_string();
        self
    }

    async fn run(
        &self,
        ctx: &CancellationToken,
        program: &str,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        let output = self.executor.execute(ctx, program, &details).await?;
        if !output.success() {
            return Err(CommandError::Failed {
                program: program.to_string(),
                arguments: details.arguments.join(" "),
                status_code: output.status_code,
                stdout: output.stdout,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl GitExecutor for ShellGitExecutor {
    async fn execute_git(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        // Keep git from blocking on credential or editor prompts.
        let details = details.with_env("GIT_TERMINAL_PROMPT", "0");
        self.run(ctx, &self.git_binary, details).await
    }

    async fn execute_github_cli(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        let details = details.with_env("GH_PROMPT_DISABLED", "1");
        self.run(ctx, &self.github_binary, details).await
    }
}

/// Typed repository queries used by the workflow operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryManager: Send + Sync {
    /// True when `git status --porcelain` reports nothing
    async fn check_clean_worktree(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
    ) -> Result<bool, CommandError>;

    async fn get_remote_url(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
        remote: &str,
    ) -> Result<Option<String>, CommandError>;

    async fn set_remote_url(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
        remote: &str,
        url: &str,
    ) -> Result<(), CommandError>;

    async fn current_branch(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
    ) -> Result<String, CommandError>;
}

pub struct GitRepositoryManager {
    executor: Arc<dyn GitExecutor>,
}

impl GitRepositoryManager {
    pub fn new(executor: Arc<dyn GitExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl RepositoryManager for GitRepositoryManager {
    async fn check_clean_worktree(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
    ) -> Result<bool, CommandError> {
        let output = self
            .executor
            .execute_git(ctx, CommandDetails::new(["status", "--porcelain"]).in_directory(repository))
            .await?;
        Ok(output.stdout.trim().is_empty())
    }

    async fn get_remote_url(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
        remote: &str,
    ) -> Result<Option<String>, CommandError> {
        let details = CommandDetails::new(["remote", "get-url", remote]).in_directory(repository);
        match self.executor.execute_git(ctx, details).await {
            Ok(output) => {
                let url = output.stdout.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(CommandError::Failed { stderr, .. }) if stderr.contains("No such remote") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_remote_url(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
        remote: &str,
        url: &str,
    ) -> Result<(), CommandError> {
        let details = CommandDetails::new(["remote", "set-url", remote, url]).in_directory(repository);
        self.executor.execute_git(ctx, details).await?;
        Ok(())
    }

    async fn current_branch(
        &self,
        ctx: &CancellationToken,
        repository: &Path,
    ) -> Result<String, CommandError> {
        let details = CommandDetails::new(["rev-parse", "--abbrev-ref", "HEAD"]).in_directory(repository);
        let output = self.executor.execute_git(ctx, details).await?;
        Ok(output.stdout.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGitExecutor;

    #[tokio::test]
    async fn test_clean_worktree_reads_porcelain_output() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_git("status --porcelain", Ok(" M README.md\n".to_string()));
        let manager = GitRepositoryManager::new(executor.clone());

        let clean = manager
            .check_clean_worktree(&CancellationToken::new(), Path::new("/repo"))
            .await
            .unwrap();

        assert!(!clean);
        assert_eq!(executor.git_commands(), vec!["status --porcelain".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_remote_is_none() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_git(
            "remote get-url origin",
            Err(RecordingGitExecutor::failure("error: No such remote 'origin'")),
        );
        let manager = GitRepositoryManager::new(executor);

        let url = manager
            .get_remote_url(&CancellationToken::new(), Path::new("/repo"), "origin")
            .await
            .unwrap();

        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn test_shell_executor_reports_non_zero_exit() {
        struct FailingExecutor;

        #[async_trait]
        impl CommandExecutor for FailingExecutor {
            async fn execute(
                &self,
                _ctx: &CancellationToken,
                _program: &str,
                _details: &CommandDetails,
            ) -> Result<CommandOutput, CommandError> {
                Ok(CommandOutput {
                    status_code: 128,
                    stdout: String::new(),
                    stderr: "fatal: not a git repository\n".to_string(),
                })
            }
        }

        let executor = ShellGitExecutor::new(Arc::new(FailingExecutor));
        let error = executor
            .execute_git(&CancellationToken::new(), CommandDetails::new(["status"]))
            .await
            .unwrap_err();

        match error {
            CommandError::Failed { status_code, stderr, .. } => {
                assert_eq!(status_code, 128);
                assert_eq!(stderr, "fatal: not a git repository");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
