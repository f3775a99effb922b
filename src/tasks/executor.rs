use super::planner::TaskPlan;
use super::TaskError;
use crate::external::{CommandDetails, CommandError, CommandOutput, NewPullRequest};
use crate::fs::DEFAULT_DIRECTORY_PERMISSIONS;
use crate::workflow::state::Environment;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Nothing to change
    Skipped { reason: String },
    /// Branch from an earlier run is still there; left untouched
    BranchExists { branch: String },
    Applied {
        branch: String,
        files: usize,
        pull_request: Option<u64>,
    },
}

/// Applies a `TaskPlan` to its repository as a fixed git sequence
pub struct TaskExecutor<'a> {
    env: &'a Environment,
    plan: &'a TaskPlan,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(env: &'a Environment, plan: &'a TaskPlan) -> Self {
        Self { env, plan }
    }

    pub async fn execute(&self, ctx: &CancellationToken) -> Result<TaskOutcome, TaskError> {
        let plan = self.plan;
        if plan.skipped {
            return Ok(TaskOutcome::Skipped {
                reason: plan.skip_reason.clone().unwrap_or_default(),
            });
        }

        if plan.ensure_clean
            && !self
                .env
                .repository_manager
                .check_clean_worktree(ctx, &plan.repository_path)
                .await?
        {
            return Err(TaskError::DirtyWorktree {
                path: plan.repository_path.clone(),
            });
        }

        if self.branch_exists(ctx).await? {
            tracing::info!(
                path = %plan.repository_path.display(),
                branch = %plan.branch_name,
                "task branch already exists, nothing to do"
            );
            return Ok(TaskOutcome::BranchExists {
                branch: plan.branch_name.clone(),
            });
        }

        let original_branch = self
            .env
            .repository_manager
            .current_branch(ctx, &plan.repository_path)
            .await?;

        let applied = self.apply(ctx).await;
        let restored = self.git(ctx, ["checkout", original_branch.as_str()]).await;

        match (applied, restored) {
            (Ok(pull_request), Ok(_)) => Ok(TaskOutcome::Applied {
                branch: plan.branch_name.clone(),
                files: plan.changed_files().count(),
                pull_request,
            }),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(restore)) => {
                tracing::warn!(
                    path = %plan.repository_path.display(),
                    branch = %original_branch,
                    error = %restore,
                    "failed to restore original branch"
                );
                Err(e)
            }
        }
    }

    async fn branch_exists(&self, ctx: &CancellationToken) -> Result<bool, TaskError> {
        match self.git(ctx, ["rev-parse", "--verify", self.plan.branch_name.as_str()]).await {
            Ok(_) => Ok(true),
            Err(CommandError::Failed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Branch, write, commit, push and optionally open a pull request
    async fn apply(&self, ctx: &CancellationToken) -> Result<Option<u64>, TaskError> {
        let plan = self.plan;
        let branch = plan.branch_name.as_str();
        let start = plan.start_point.as_str();

        self.git(ctx, ["checkout", start]).await?;
        self.git(ctx, ["checkout", "-B", branch, start]).await?;

        for change in plan.changed_files() {
            if let Some(parent) = change.absolute_path.parent() {
                self.env
                    .file_system
                    .mkdir_all(parent, DEFAULT_DIRECTORY_PERMISSIONS)
                    .await
                    .map_err(|source| TaskError::Io {
                        context: format!("creating {}", parent.display()),
                        source,
                    })?;
            }
            self.env
                .file_system
                .write_file(&change.absolute_path, change.content.as_bytes(), change.permissions)
                .await
                .map_err(|source| TaskError::Io {
                    context: format!("writing {}", change.absolute_path.display()),
                    source,
                })?;
        }

        for change in plan.changed_files() {
            self.git(ctx, ["add", change.relative_path.as_str()]).await?;
        }
        self.git(ctx, ["commit", "-m", plan.commit_message.as_str()]).await?;
        self.git(ctx, ["push", "--set-upstream", plan.push_remote.as_str(), branch])
            .await?;

        let Some(request) = &plan.pull_request else {
            return Ok(None);
        };
        if request.repository.is_empty() {
            return Err(TaskError::MissingRepositoryIdentifier {
                path: plan.repository_path.clone(),
            });
        }
        let number = self
            .env
            .github_client
            .create_pull_request(
                ctx,
                &request.repository,
                &NewPullRequest {
                    title: request.title.clone(),
                    body: request.body.clone(),
                    head_branch: branch.to_string(),
                    base_branch: request.base.clone(),
                    draft: request.draft,
                },
            )
            .await?;
        Ok(Some(number))
    }

    async fn git<const N: usize>(&self, ctx: &CancellationToken, arguments: [&str; N]) -> Result<CommandOutput, CommandError> {
        let details = CommandDetails::new(arguments).in_directory(&self.plan.repository_path);
        self.env.git_executor.execute_git(ctx, details).await
    }
}
