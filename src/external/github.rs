//! GitHub CLI abstractions
//!
//! Provides the `GitHubClient` trait the engine talks to and a `gh`-backed
//! implementation that routes every call through the injected `GitExecutor`.

use super::command::{CommandDetails, CommandError};
use super::git::GitExecutor;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub type PrId = u64;

/// Message GitHub answers with for a branch that has no protection rules
const BRANCH_NOT_PROTECTED: &str = "branch not protected";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub authentication failed: {message}")]
    AuthenticationFailed { message: String },
    #[error("GitHub resource not found: {resource}")]
    NotFound { resource: String },
    #[error("GitHub request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid response from GitHub CLI: {message}")]
    InvalidResponse { message: String },
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
}

impl GitHubError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GitHubError::CommandError { source } if source.is_cancelled())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: PrId,
    pub title: String,
    pub head_ref: String,
    pub base_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestListOptions {
    pub state: String,
    pub base_branch: String,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
    pub draft: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagesStatus {
    pub enabled: bool,
    pub build_type: String,
    pub source_branch: String,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesConfiguration {
    pub source_branch: String,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub name_with_owner: String,
    pub default_branch: String,
}

/// Trait for GitHub operations
///
/// Repositories are addressed by their `owner/repo` identifier.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    async fn resolve_repository_metadata(
        &self,
        ctx: &CancellationToken,
        repository: &str,
    ) -> Result<RepositoryMetadata, GitHubError>;

    async fn list_pull_requests(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        options: &PullRequestListOptions,
    ) -> Result<Vec<PullRequest>, GitHubError>;

    async fn update_pull_request_base(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        number: PrId,
        base_branch: &str,
    ) -> Result<(), GitHubError>;

    async fn create_pull_request(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        request: &NewPullRequest,
    ) -> Result<PrId, GitHubError>;

    async fn set_default_branch(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<(), GitHubError>;

    async fn check_branch_protection(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<bool, GitHubError>;

    async fn get_pages_config(
        &self,
        ctx: &CancellationToken,
        repository: &str,
    ) -> Result<PagesStatus, GitHubError>;

    async fn update_pages_config(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        configuration: &PagesConfiguration,
    ) -> Result<(), GitHubError>;
}

/// Real GitHub CLI implementation
pub struct GhCliClient {
    executor: Arc<dyn GitExecutor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRecord {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    head_ref_name: String,
    #[serde(default)]
    base_ref_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryViewRecord {
    name_with_owner: String,
    default_branch_ref: Option<BranchRefRecord>,
}

#[derive(Deserialize)]
struct BranchRefRecord {
    name: String,
}

#[derive(Deserialize)]
struct PagesRecord {
    #[serde(default)]
    build_type: Option<String>,
    #[serde(default)]
    source: Option<PagesSourceRecord>,
}

#[derive(Deserialize)]
struct PagesSourceRecord {
    branch: String,
    #[serde(default)]
    path: String,
}

impl GhCliClient {
    pub fn new(executor: Arc<dyn GitExecutor>) -> Self {
        Self { executor }
    }

    async fn execute_gh_command(
        &self,
        ctx: &CancellationToken,
        args: &[&str],
    ) -> Result<String, GitHubError> {
        match self.executor.execute_github_cli(ctx, CommandDetails::new(args.iter().copied())).await {
            Ok(output) => Ok(output.stdout),
            Err(CommandError::Failed { stderr, .. }) => Err(classify_gh_error(&stderr, args)),
            Err(e) => Err(e.into()),
        }
    }

    fn parse_json<T: serde::de::DeserializeOwned>(output: &str, what: &str) -> Result<T, GitHubError> {
        serde_json::from_str(output).map_err(|e| GitHubError::InvalidResponse {
            message: format!("Failed to parse {what} JSON: {e}"),
        })
    }
}

fn classify_gh_error(stderr: &str, args: &[&str]) -> GitHubError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("authentication") || lowered.contains("not logged in") || lowered.contains("http 401") {
        GitHubError::AuthenticationFailed {
            message: stderr.to_string(),
        }
    } else if lowered.contains("http 404") || lowered.contains("not found") {
        GitHubError::NotFound {
            resource: args.join(" "),
        }
    } else {
        GitHubError::RequestFailed {
            message: stderr.to_string(),
        }
    }
}

fn parse_pull_request_number(url: &str) -> Result<PrId, GitHubError> {
    url.trim()
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| GitHubError::InvalidResponse {
            message: format!("Could not parse pull request number from URL: {url}"),
        })
}

#[async_trait]
impl GitHubClient for GhCliClient {
    async fn resolve_repository_metadata(
        &self,
        ctx: &CancellationToken,
        repository: &str,
    ) -> Result<RepositoryMetadata, GitHubError> {
        let output = self
            .execute_gh_command(ctx, &["repo", "view", repository, "--json", "nameWithOwner,defaultBranchRef"])
            .await?;
        let record: RepositoryViewRecord = Self::parse_json(&output, "repository")?;
        Ok(RepositoryMetadata {
            name_with_owner: record.name_with_owner,
            default_branch: record.default_branch_ref.map(|r| r.name).unwrap_or_default(),
        })
    }

    async fn list_pull_requests(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        options: &PullRequestListOptions,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let limit = options.limit.to_string();
        let output = self
            .execute_gh_command(
                ctx,
                &[
                    "pr",
                    "list",
                    "--repo",
                    repository,
                    "--state",
                    &options.state,
                    "--base",
                    &options.base_branch,
                    "--json",
                    "number,title,headRefName,baseRefName",
                    "--limit",
                    &limit,
                ],
            )
            .await?;
        let records: Vec<PullRequestRecord> = Self::parse_json(&output, "pull request list")?;
        Ok(records
            .into_iter()
            .map(|record| PullRequest {
                number: record.number,
                title: record.title,
                head_ref: record.head_ref_name,
                base_ref: record.base_ref_name,
            })
            .collect())
    }

    async fn update_pull_request_base(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        number: PrId,
        base_branch: &str,
    ) -> Result<(), GitHubError> {
        let number = number.to_string();
        self.execute_gh_command(ctx, &["pr", "edit", &number, "--repo", repository, "--base", base_branch])
            .await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        request: &NewPullRequest,
    ) -> Result<PrId, GitHubError> {
        let mut args = vec![
            "pr",
            "create",
            "--repo",
            repository,
            "--title",
            &request.title,
            "--body",
            &request.body,
            "--head",
            &request.head_branch,
            "--base",
            &request.base_branch,
        ];
        if request.draft {
            args.push("--draft");
        }
        let output = self.execute_gh_command(ctx, &args).await?;
        parse_pull_request_number(&output)
    }

    async fn set_default_branch(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<(), GitHubError> {
        let endpoint = format!("repos/{repository}");
        let field = format!("default_branch={branch}");
        self.execute_gh_command(ctx, &["api", "-X", "PATCH", &endpoint, "-f", &field])
            .await?;
        Ok(())
    }

    async fn check_branch_protection(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<bool, GitHubError> {
        let endpoint = format!("repos/{repository}/branches/{branch}/protection");
        let args = ["api", endpoint.as_str()];
        // Only GitHub's explicit answer means unprotected; any other 404
        // (missing repository, no admin access) is left to the caller.
        match self.executor.execute_github_cli(ctx, CommandDetails::new(args)).await {
            Ok(_) => Ok(true),
            Err(e @ CommandError::Failed { .. }) if e.output_text().to_lowercase().contains(BRANCH_NOT_PROTECTED) => {
                Ok(false)
            }
            Err(CommandError::Failed { stderr, .. }) => Err(classify_gh_error(&stderr, &args)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_pages_config(
        &self,
        ctx: &CancellationToken,
        repository: &str,
    ) -> Result<PagesStatus, GitHubError> {
        let endpoint = format!("repos/{repository}/pages");
        let output = match self.execute_gh_command(ctx, &["api", &endpoint]).await {
            Ok(output) => output,
            Err(GitHubError::NotFound { .. }) => return Ok(PagesStatus::default()),
            Err(e) => return Err(e),
        };
        let record: PagesRecord = Self::parse_json(&output, "pages")?;
        let source = record.source;
        Ok(PagesStatus {
            enabled: true,
            build_type: record.build_type.unwrap_or_default(),
            source_branch: source.as_ref().map(|s| s.branch.clone()).unwrap_or_default(),
            source_path: source.map(|s| s.path).unwrap_or_default(),
        })
    }

    async fn update_pages_config(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        configuration: &PagesConfiguration,
    ) -> Result<(), GitHubError> {
        let endpoint = format!("repos/{repository}/pages");
        let branch = format!("source[branch]={}", configuration.source_branch);
        let path = format!("source[path]={}", configuration.source_path);
        self.execute_gh_command(ctx, &["api", "-X", "PUT", &endpoint, "-f", &branch, "-f", &path])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGitExecutor;

    #[tokio::test]
    async fn test_list_pull_requests_parses_json() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_gh(
            "pr list --repo octo/demo --state open --base main --json number,title,headRefName,baseRefName --limit 100",
            Ok(r#"[{"number":7,"title":"Docs","headRefName":"docs","baseRefName":"main"}]"#.to_string()),
        );
        let client = GhCliClient::new(executor);

        let prs = client
            .list_pull_requests(
                &CancellationToken::new(),
                "octo/demo",
                &PullRequestListOptions {
                    state: "open".to_string(),
                    base_branch: "main".to_string(),
                    limit: 100,
                },
            )
            .await
            .unwrap();

        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 7);
        assert_eq!(prs[0].head_ref, "docs");
    }

    #[tokio::test]
    async fn test_unprotected_branch_reports_false() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_gh(
            "api repos/octo/demo/branches/main/protection",
            Err(RecordingGitExecutor::failure("gh: Branch not protected (HTTP 404)")),
        );
        let client = GhCliClient::new(executor);

        let protected = client
            .check_branch_protection(&CancellationToken::new(), "octo/demo", "main")
            .await
            .unwrap();

        assert!(!protected);
    }

    #[tokio::test]
    async fn test_protection_lookup_404_for_other_reasons_is_an_error() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_gh(
            "api repos/octo/gone/branches/main/protection",
            Err(RecordingGitExecutor::failure("gh: Not Found (HTTP 404)")),
        );
        let client = GhCliClient::new(executor);

        let error = client
            .check_branch_protection(&CancellationToken::new(), "octo/gone", "main")
            .await
            .unwrap_err();

        assert!(matches!(error, GitHubError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_pages_not_configured_is_disabled() {
        let executor = Arc::new(RecordingGitExecutor::new());
        executor.respond_gh(
            "api repos/octo/demo/pages",
            Err(RecordingGitExecutor::failure("gh: Not Found (HTTP 404)")),
        );
        let client = GhCliClient::new(executor);

        let status = client
            .get_pages_config(&CancellationToken::new(), "octo/demo")
            .await
            .unwrap();

        assert!(!status.enabled);
    }

    #[test]
    fn test_parse_pull_request_number() {
        assert_eq!(parse_pull_request_number("https://github.com/o/r/pull/42\n").unwrap(), 42);
        assert!(parse_pull_request_number("not a url").is_err());
    }
}
