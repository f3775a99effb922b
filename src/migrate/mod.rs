//! Default-branch migration
//!
//! Moves a repository from one default branch to another: rewrites CI
//! workflow branch filters, keeps GitHub Pages pointed at the new branch,
//! switches the GitHub default branch, retargets open pull requests and
//! finally reports whether the old branch is safe to delete.

pub mod rewrite;
pub mod safety;
pub mod types;

use crate::external::{
    CommandDetails, CommandError, GitExecutor, GitHubClient, GitHubError, PagesConfiguration, PullRequestListOptions,
    RepositoryManager,
};
use crate::fs::FileSystem;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use rewrite::{RewriteSummary, WorkflowRewriter};
pub use safety::evaluate_safety;
pub use types::{
    MigrationError, MigrationOptions, MigrationResult, SafetyInputs, SafetyStatus, DEFAULT_REMOTE,
    DEFAULT_SOURCE_BRANCH, DEFAULT_TARGET_BRANCH, DEFAULT_WORKFLOWS_DIRECTORY,
};

const PULL_REQUEST_LIST_LIMIT: u32 = 200;

pub struct MigrationService {
    executor: Arc<dyn GitExecutor>,
    manager: Arc<dyn RepositoryManager>,
    github: Arc<dyn GitHubClient>,
    file_system: Arc<dyn FileSystem>,
}

impl MigrationService {
    pub fn new(
        executor: Arc<dyn GitExecutor>,
        manager: Arc<dyn RepositoryManager>,
        github: Arc<dyn GitHubClient>,
        file_system: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            executor,
            manager,
            github,
            file_system,
        }
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        options: &MigrationOptions,
    ) -> Result<MigrationResult, MigrationError> {
        options.validate()?;
        let mut result = MigrationResult::default();

        if !self.manager.check_clean_worktree(ctx, &options.repository_path).await? {
            return Err(MigrationError::DirtyWorktree {
                path: options.repository_path.clone(),
            });
        }

        let summary = self.rewrite_workflows(options).await?;
        result.remaining_main_references = summary.remaining_references;
        result.updated_workflow_files = summary.updated_files;

        if !result.updated_workflow_files.is_empty() {
            result.workflow_commit_created = self.commit_workflows(ctx, options).await?;
            if result.workflow_commit_created && options.push_updates {
                self.git(
                    ctx,
                    options,
                    ["push", options.repository_remote.as_str(), options.target_branch.as_str()],
                )
                .await?;
                result.workflow_changes_pushed = true;
            }
        }

        match self.ensure_pages_branch(ctx, options).await {
            Ok(updated) => result.pages_configuration_updated = updated,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => result.warnings.push(format!(
                "PAGES-SKIP: {}: unable to update GitHub Pages source: {e}",
                options.repository_identifier
            )),
        }

        self.github
            .set_default_branch(ctx, &options.repository_identifier, &options.target_branch)
            .await
            .map_err(|source| {
                if source.is_cancelled() {
                    return MigrationError::GitHub(source);
                }
                MigrationError::DefaultBranchUpdate {
                    repository_path: options.repository_path.clone(),
                    repository_identifier: options.repository_identifier.clone(),
                    source_branch: options.source_branch.clone(),
                    target_branch: options.target_branch.clone(),
                    message: source.to_string(),
                    source,
                }
            })?;
        result.default_branch_updated = true;

        let open = self.retarget_pull_requests(ctx, options, &mut result).await?;

        let branch_protected = match self
            .github
            .check_branch_protection(ctx, &options.repository_identifier, &options.source_branch)
            .await
        {
            Ok(protected) => protected,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                result.warnings.push(format!(
                    "PROTECTION-SKIP: {}: unable to check protection of {}: {e}",
                    options.repository_identifier, options.source_branch
                ));
                true
            }
        };

        result.safety_status = evaluate_safety(&SafetyInputs {
            open_pull_requests: open,
            branch_protected,
            workflow_mentions_remain: result.remaining_main_references,
        });
        tracing::info!(
            repository = %options.repository_identifier,
            source = %options.source_branch,
            target = %options.target_branch,
            safe_to_delete = result.safety_status.safe_to_delete,
            warnings = result.warnings.len(),
            "branch migration finished"
        );
        Ok(result)
    }

    async fn rewrite_workflows(&self, options: &MigrationOptions) -> Result<RewriteSummary, MigrationError> {
        let path = options.workflows_path();
        let rewriter = WorkflowRewriter::new(&options.source_branch, &options.target_branch).map_err(|e| {
            MigrationError::WorkflowRewrite {
                path: path.clone(),
                source: std::io::Error::other(e),
            }
        })?;
        rewriter
            .rewrite_directory(self.file_system.as_ref(), &path)
            .await
            .map_err(|source| MigrationError::WorkflowRewrite { path, source })
    }

    /// Stage and commit the workflow directory; false when git had nothing to commit
    async fn commit_workflows(&self, ctx: &CancellationToken, options: &MigrationOptions) -> Result<bool, MigrationError> {
        self.git(ctx, options, ["add", "-A", options.workflows_directory.as_str()])
            .await?;
        let message = format!("CI: switch workflow branch filters to {}", options.target_branch);
        match self.git(ctx, options, ["commit", "-m", message.as_str()]).await {
            Ok(()) => Ok(true),
            Err(e @ CommandError::Failed { .. }) if e.output_text().contains("nothing to commit") => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move a Pages site built from the source branch onto the target branch
    async fn ensure_pages_branch(&self, ctx: &CancellationToken, options: &MigrationOptions) -> Result<bool, GitHubError> {
        let status = self.github.get_pages_config(ctx, &options.repository_identifier).await?;
        if !status.enabled || status.source_branch != options.source_branch {
            return Ok(false);
        }
        self.github
            .update_pages_config(
                ctx,
                &options.repository_identifier,
                &PagesConfiguration {
                    source_branch: options.target_branch.clone(),
                    source_path: status.source_path,
                },
            )
            .await?;
        Ok(true)
    }

    /// Retarget open pull requests; returns how many still target the source branch
    async fn retarget_pull_requests(
        &self,
        ctx: &CancellationToken,
        options: &MigrationOptions,
        result: &mut MigrationResult,
    ) -> Result<usize, MigrationError> {
        let listing = PullRequestListOptions {
            state: "open".to_string(),
            base_branch: options.source_branch.clone(),
            limit: PULL_REQUEST_LIST_LIMIT,
        };
        let pull_requests = self
            .github
            .list_pull_requests(ctx, &options.repository_identifier, &listing)
            .await
            .map_err(|source| {
                if source.is_cancelled() {
                    return MigrationError::GitHub(source);
                }
                MigrationError::PullRequestList {
                    repository: options.repository_identifier.clone(),
                    source,
                }
            })?;

        for pull_request in &pull_requests {
            match self
                .github
                .update_pull_request_base(
                    ctx,
                    &options.repository_identifier,
                    pull_request.number,
                    &options.target_branch,
                )
                .await
            {
                Ok(()) => result.retargeted_pull_requests.push(pull_request.number),
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => result.warnings.push(format!(
                    "PR-RETARGET-SKIP: {}#{}: {e}",
                    options.repository_identifier, pull_request.number
                )),
            }
        }
        Ok(pull_requests.len() - result.retargeted_pull_requests.len())
    }

    async fn git<const N: usize>(
        &self,
        ctx: &CancellationToken,
        options: &MigrationOptions,
        arguments: [&str; N],
    ) -> Result<(), CommandError> {
        let details = CommandDetails::new(arguments).in_directory(&options.repository_path);
        self.executor.execute_git(ctx, details).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{GitRepositoryManager, PagesStatus, PullRequest};
    use crate::fs::OsFileSystem;
    use crate::testing::{write_file, FakeGitHubClient, RecordingGitExecutor};
    use std::path::Path;

    struct Fixture {
        git: Arc<RecordingGitExecutor>,
        github: Arc<FakeGitHubClient>,
        service: MigrationService,
    }

    fn fixture() -> Fixture {
        let git = Arc::new(RecordingGitExecutor::new());
        let github = Arc::new(FakeGitHubClient::new());
        let service = MigrationService::new(
            git.clone(),
            Arc::new(GitRepositoryManager::new(git.clone())),
            github.clone(),
            Arc::new(OsFileSystem),
        );
        Fixture { git, github, service }
    }

    fn options(root: &Path) -> MigrationOptions {
        MigrationOptions {
            repository_path: root.to_path_buf(),
            repository_remote: "origin".to_string(),
            repository_identifier: "octo/demo".to_string(),
            workflows_directory: ".github/workflows".to_string(),
            source_branch: "main".to_string(),
            target_branch: "master".to_string(),
            push_updates: true,
        }
    }

    fn pull_request(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            head_ref: format!("feature-{number}"),
            base_ref: "main".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_migration() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), ".github/workflows/ci.yml", "on:\n  push:\n    branches: [main]\n");
        let f = fixture();
        *f.github.pages.lock().unwrap() = Some(Ok(PagesStatus {
            enabled: true,
            build_type: "legacy".to_string(),
            source_branch: "main".to_string(),
            source_path: "/docs".to_string(),
        }));
        *f.github.pull_requests.lock().unwrap() = vec![pull_request(7)];

        let result = f.service.execute(&CancellationToken::new(), &options(temp.path())).await.unwrap();

        assert_eq!(result.updated_workflow_files.len(), 1);
        assert!(!result.remaining_main_references);
        assert!(result.workflow_commit_created);
        assert!(result.workflow_changes_pushed);
        assert!(result.pages_configuration_updated);
        assert!(result.default_branch_updated);
        assert_eq!(result.retargeted_pull_requests, vec![7]);
        assert!(result.safety_status.safe_to_delete);
        assert!(result.warnings.is_empty());
        assert_eq!(
            f.git.git_commands(),
            vec![
                "status --porcelain",
                "add -A .github/workflows",
                "commit -m CI: switch workflow branch filters to master",
                "push origin master",
            ]
        );
        assert!(f.github.calls().contains(&"update-pages octo/demo master".to_string()));
    }

    #[tokio::test]
    async fn test_pages_failure_is_advisory() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.pages.lock().unwrap() = Some(Err("HTTP 500".to_string()));

        let result = f.service.execute(&CancellationToken::new(), &options(temp.path())).await.unwrap();

        assert!(result.default_branch_updated);
        assert!(!result.pages_configuration_updated);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("PAGES-SKIP"));
    }

    #[tokio::test]
    async fn test_retarget_failure_does_not_stop_the_rest() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.pull_requests.lock().unwrap() = vec![pull_request(1), pull_request(2), pull_request(3)];
        f.github.retarget_failures.lock().unwrap().insert(2);

        let result = f.service.execute(&CancellationToken::new(), &options(temp.path())).await.unwrap();

        assert_eq!(result.retargeted_pull_requests, vec![1, 3]);
        assert!(result.warnings.iter().any(|w| w.contains("PR-RETARGET-SKIP")));
        assert!(!result.safety_status.safe_to_delete);
        assert_eq!(result.safety_status.blocking_reasons.len(), 1);
    }

    #[tokio::test]
    async fn test_protection_failure_blocks_deletion() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.protection.lock().unwrap() = Some(Err("HTTP 403".to_string()));

        let result = f.service.execute(&CancellationToken::new(), &options(temp.path())).await.unwrap();

        assert!(result.warnings.iter().any(|w| w.contains("PROTECTION-SKIP")));
        assert!(!result.safety_status.safe_to_delete);
    }

    #[tokio::test]
    async fn test_default_branch_failure_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.default_branch_error.lock().unwrap() = Some("HTTP 422".to_string());

        let error = f
            .service
            .execute(&CancellationToken::new(), &options(temp.path()))
            .await
            .unwrap_err();

        assert!(matches!(error, MigrationError::DefaultBranchUpdate { .. }));
        let message = error.to_string();
        assert!(message.contains("octo/demo"));
        assert!(message.contains("main"));
        assert!(message.contains("master"));
        assert!(message.contains("HTTP 422"));
    }

    #[tokio::test]
    async fn test_nothing_to_commit_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), ".github/workflows/ci.yml", "branches: [main]\n");
        let f = fixture();
        f.git.respond_git(
            "commit -m CI: switch workflow branch filters to master",
            Err(CommandError::Failed {
                program: "git".to_string(),
                arguments: "commit".to_string(),
                status_code: 1,
                stdout: "nothing to commit, working tree clean".to_string(),
                stderr: String::new(),
            }),
        );

        let result = f.service.execute(&CancellationToken::new(), &options(temp.path())).await.unwrap();

        assert!(!result.workflow_commit_created);
        assert!(!result.workflow_changes_pushed);
        assert!(!f.git.git_commands().iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_dirty_worktree_stops_before_rewrite() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), ".github/workflows/ci.yml", "branches: [main]\n");
        let f = fixture();
        f.git.respond_git("status --porcelain", Ok("?? scratch.txt\n".to_string()));

        let error = f
            .service
            .execute(&CancellationToken::new(), &options(temp.path()))
            .await
            .unwrap_err();

        assert!(matches!(error, MigrationError::DirtyWorktree { .. }));
        assert_eq!(
            std::fs::read_to_string(temp.path().join(".github/workflows/ci.yml")).unwrap(),
            "branches: [main]\n"
        );
        assert!(f.github.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_listing_failure_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.list_error.lock().unwrap() = Some("HTTP 502".to_string());

        let error = f
            .service
            .execute(&CancellationToken::new(), &options(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(error, MigrationError::PullRequestList { .. }));
    }

    async fn cancelled_during(f: &Fixture, root: &Path, call: &'static str) -> MigrationError {
        *f.github.cancel_during.lock().unwrap() = Some(call);
        let ctx = CancellationToken::new();
        let error = f.service.execute(&ctx, &options(root)).await.unwrap_err();
        assert!(ctx.is_cancelled());
        error
    }

    #[tokio::test]
    async fn test_cancelled_pages_lookup_aborts_instead_of_warning() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();

        let error = cancelled_during(&f, temp.path(), "pages").await;

        assert!(error.is_cancelled());
        assert!(matches!(error, MigrationError::GitHub(_)));
        assert!(!f.github.calls().iter().any(|c| c.starts_with("set-default")));
    }

    #[tokio::test]
    async fn test_cancelled_retarget_aborts_the_remaining_pull_requests() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();
        *f.github.pull_requests.lock().unwrap() = vec![pull_request(1), pull_request(2)];

        let error = cancelled_during(&f, temp.path(), "retarget").await;

        assert!(error.is_cancelled());
        let calls = f.github.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("retarget")).count(), 1);
        assert!(!calls.iter().any(|c| c.starts_with("protection")));
    }

    #[tokio::test]
    async fn test_cancelled_protection_check_aborts_instead_of_warning() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();

        let error = cancelled_during(&f, temp.path(), "protection").await;

        assert!(error.is_cancelled());
        assert!(!error.to_string().contains("PROTECTION-SKIP"));
    }

    #[tokio::test]
    async fn test_cancelled_default_branch_update_is_not_reported_as_rejection() {
        let temp = tempfile::tempdir().unwrap();
        let f = fixture();

        let error = cancelled_during(&f, temp.path(), "set-default").await;

        assert!(error.is_cancelled());
        assert!(!matches!(error, MigrationError::DefaultBranchUpdate { .. }));
    }
}
