//! Repository discovery and inspection
//!
//! The workflow engine only sees `RepositoryInspection` snapshots produced by
//! a `RepositoryInspector`. `GitInspector` is the concrete provider used by
//! the binary: it walks the roots for `.git` markers and asks git and gh for
//! the facts each operation needs.

pub mod report;

use crate::external::{CommandDetails, CommandError, GitExecutor, GitHubClient, RepositoryManager};
use crate::repos::remotes::{detect_protocol, OwnerRepository, RemoteProtocol, RemoteUrl};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

pub use report::{write_audit_report, AUDIT_REPORT_HEADER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionDepth {
    /// Local facts only
    Minimal,
    /// Local facts plus GitHub metadata and upstream sync state
    Full,
}

/// Point-in-time facts about one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInspection {
    pub path: PathBuf,
    pub folder_name: String,
    pub origin_url: String,
    pub origin_owner_repo: String,
    pub canonical_owner_repo: String,
    pub remote_protocol: RemoteProtocol,
    pub remote_default_branch: String,
    pub local_branch: String,
    pub in_sync: Option<bool>,
}

impl RepositoryInspection {
    pub fn canonical(&self) -> Option<OwnerRepository> {
        OwnerRepository::parse(&self.canonical_owner_repo).ok()
    }

    pub fn origin(&self) -> Option<OwnerRepository> {
        OwnerRepository::parse(&self.origin_owner_repo).ok()
    }

    /// Canonical `owner/repo` when known, otherwise the origin's
    pub fn final_github_repo(&self) -> &str {
        if self.canonical_owner_repo.is_empty() {
            &self.origin_owner_repo
        } else {
            &self.canonical_owner_repo
        }
    }

    /// Repository name used for folder naming and templates
    pub fn repository_name(&self) -> String {
        OwnerRepository::parse(self.final_github_repo())
            .map(|o| o.repository().to_string())
            .unwrap_or_else(|_| self.folder_name.clone())
    }

    pub fn name_matches(&self) -> bool {
        self.folder_name == self.repository_name()
    }

    pub fn origin_matches_canonical(&self) -> Option<bool> {
        match (self.origin(), self.canonical()) {
            (Some(origin), Some(canonical)) => Some(origin.matches(&canonical)),
            _ => None,
        }
    }
}

/// Produces inspections for every repository under the given roots
#[async_trait]
pub trait RepositoryInspector: Send + Sync {
    async fn inspect(
        &self,
        ctx: &CancellationToken,
        roots: &[PathBuf],
        depth: InspectionDepth,
    ) -> Result<Vec<RepositoryInspection>>;
}

pub struct GitInspector {
    executor: Arc<dyn GitExecutor>,
    manager: Arc<dyn RepositoryManager>,
    github: Arc<dyn GitHubClient>,
}

impl GitInspector {
    pub fn new(
        executor: Arc<dyn GitExecutor>,
        manager: Arc<dyn RepositoryManager>,
        github: Arc<dyn GitHubClient>,
    ) -> Self {
        Self {
            executor,
            manager,
            github,
        }
    }

    async fn inspect_one(
        &self,
        ctx: &CancellationToken,
        path: &Path,
        depth: InspectionDepth,
    ) -> Result<RepositoryInspection> {
        let folder_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let origin_url = self.manager.get_remote_url(ctx, path, "origin").await?.unwrap_or_default();
        let local_branch = match self.manager.current_branch(ctx, path).await {
            Ok(branch) => branch,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unable to resolve local branch");
                String::new()
            }
        };
        let origin_owner_repo = RemoteUrl::parse(&origin_url)
            .map(|u| u.owner_repository.to_string())
            .unwrap_or_default();

        let mut inspection = RepositoryInspection {
            path: path.to_path_buf(),
            folder_name,
            remote_protocol: detect_protocol(&origin_url),
            origin_url,
            origin_owner_repo,
            canonical_owner_repo: String::new(),
            remote_default_branch: String::new(),
            local_branch,
            in_sync: None,
        };

        if depth == InspectionDepth::Full && !inspection.origin_owner_repo.is_empty() {
            match self
                .github
                .resolve_repository_metadata(ctx, &inspection.origin_owner_repo)
                .await
            {
                Ok(metadata) => {
                    inspection.canonical_owner_repo = metadata.name_with_owner;
                    inspection.remote_default_branch = metadata.default_branch;
                }
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => tracing::warn!(
                    repository = %inspection.origin_owner_repo,
                    error = %e,
                    "unable to resolve GitHub metadata"
                ),
            }
            inspection.in_sync = self.upstream_in_sync(ctx, path).await?;
        }

        Ok(inspection)
    }

    async fn upstream_in_sync(&self, ctx: &CancellationToken, path: &Path) -> Result<Option<bool>> {
        let head = self.rev_parse(ctx, path, "HEAD").await?;
        let upstream = self.rev_parse(ctx, path, "@{upstream}").await?;
        Ok(match (head, upstream) {
            (Some(head), Some(upstream)) => Some(head == upstream),
            _ => None,
        })
    }

    async fn rev_parse(&self, ctx: &CancellationToken, path: &Path, revision: &str) -> Result<Option<String>> {
        let details = CommandDetails::new(["rev-parse", revision]).in_directory(path);
        match self.executor.execute_git(ctx, details).await {
            Ok(output) => Ok(Some(output.stdout.trim().to_string())),
            Err(CommandError::Failed { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Find repository roots below `roots`, never descending into a repository
pub fn discover_repositories(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        let mut walker = WalkDir::new(root).follow_links(false).into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.file_name() == ".git" {
                walker.skip_current_dir();
                continue;
            }
            if entry.path().join(".git").exists() {
                if !found.iter().any(|p: &PathBuf| p == entry.path()) {
                    found.push(entry.path().to_path_buf());
                }
                walker.skip_current_dir();
            }
        }
    }
    found
}

#[async_trait]
impl RepositoryInspector for GitInspector {
    async fn inspect(
        &self,
        ctx: &CancellationToken,
        roots: &[PathBuf],
        depth: InspectionDepth,
    ) -> Result<Vec<RepositoryInspection>> {
        let mut inspections = Vec::new();
        for path in discover_repositories(roots) {
            inspections.push(self.inspect_one(ctx, &path, depth).await?);
        }
        Ok(inspections)
    }
}
