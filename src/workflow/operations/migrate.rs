use super::{Operation, MIGRATE_BRANCH};
use crate::migrate::{
    MigrationOptions, MigrationService, DEFAULT_REMOTE, DEFAULT_SOURCE_BRANCH, DEFAULT_TARGET_BRANCH,
    DEFAULT_WORKFLOWS_DIRECTORY,
};
use crate::workflow::config::OptionMap;
use crate::workflow::errors::ConfigurationError;
use crate::workflow::outcome::handle_repository_failure;
use crate::workflow::registry::{decode_options, BuildContext};
use crate::workflow::state::{Environment, RepositoryState, State};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrateOptions {
    #[serde(default)]
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    remote_name: Option<String>,
    #[serde(default)]
    source_branch: Option<String>,
    #[serde(default)]
    target_branch: Option<String>,
    #[serde(default)]
    workflows_directory: Option<String>,
    #[serde(default)]
    push_to_remote: Option<bool>,
}

/// Which discovered repositories a migration target applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    Path(PathBuf),
    /// GitHub `owner/repo`, compared case-insensitively
    Repository(String),
    All,
}

impl TargetSelector {
    fn matches(&self, repository: &RepositoryState) -> bool {
        match self {
            Self::Path(path) => &repository.path == path,
            Self::Repository(identifier) => {
                let inspection = &repository.inspection;
                inspection.final_github_repo().eq_ignore_ascii_case(identifier)
                    || inspection.origin_owner_repo.eq_ignore_ascii_case(identifier)
            }
            Self::All => true,
        }
    }
}

impl std::fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Repository(identifier) => f.write_str(identifier),
            Self::All => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationTarget {
    pub selector: TargetSelector,
    pub remote: String,
    pub source_branch: String,
    pub target_branch: String,
    pub workflows_directory: String,
    pub push: bool,
}

impl MigrationTarget {
    pub fn new(selector: TargetSelector) -> Self {
        Self {
            selector,
            remote: DEFAULT_REMOTE.to_string(),
            source_branch: DEFAULT_SOURCE_BRANCH.to_string(),
            target_branch: DEFAULT_TARGET_BRANCH.to_string(),
            workflows_directory: DEFAULT_WORKFLOWS_DIRECTORY.to_string(),
            push: true,
        }
    }

    fn options_for(&self, repository: &RepositoryState) -> MigrationOptions {
        MigrationOptions {
            repository_path: repository.path.clone(),
            repository_remote: self.remote.clone(),
            repository_identifier: repository.inspection.final_github_repo().to_string(),
            workflows_directory: self.workflows_directory.clone(),
            source_branch: self.source_branch.clone(),
            target_branch: self.target_branch.clone(),
            push_updates: self.push,
        }
    }
}

fn non_empty(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Moves repositories from one default branch to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateBranchOperation {
    pub targets: Vec<MigrationTarget>,
}

impl MigrateBranchOperation {
    pub fn new(targets: Vec<MigrationTarget>) -> Self {
        Self { targets }
    }

    pub fn from_options(options: &OptionMap, context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: MigrateOptions = decode_options(MIGRATE_BRANCH, options)?;
        if raw.targets.is_empty() {
            return Err(ConfigurationError::invalid(MIGRATE_BRANCH, "at least one target is required"));
        }

        let mut targets = Vec::with_capacity(raw.targets.len());
        for (index, target) in raw.targets.into_iter().enumerate() {
            let repository = target.repository.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
            let path = target.path.as_deref().and_then(|p| context.sanitizer.sanitize(p));
            let selector = match (path, repository) {
                (Some(path), _) => TargetSelector::Path(path),
                (None, Some(repository)) => TargetSelector::Repository(repository),
                (None, None) => {
                    return Err(ConfigurationError::invalid(
                        MIGRATE_BRANCH,
                        format!("target {index} needs a repository or a path"),
                    ))
                }
            };
            let resolved = MigrationTarget {
                selector,
                remote: non_empty(target.remote_name, DEFAULT_REMOTE),
                source_branch: non_empty(target.source_branch, DEFAULT_SOURCE_BRANCH),
                target_branch: non_empty(target.target_branch, DEFAULT_TARGET_BRANCH),
                workflows_directory: non_empty(target.workflows_directory, DEFAULT_WORKFLOWS_DIRECTORY),
                push: target.push_to_remote.unwrap_or(true),
            };
            if resolved.source_branch == resolved.target_branch {
                return Err(ConfigurationError::invalid(
                    MIGRATE_BRANCH,
                    format!("target {index}: source and target branch are both {}", resolved.source_branch),
                ));
            }
            targets.push(resolved);
        }
        Ok(Box::new(Self::new(targets)))
    }

    async fn migrate(
        &self,
        ctx: &CancellationToken,
        env: &Environment,
        target: &MigrationTarget,
        repository: &mut RepositoryState,
    ) -> anyhow::Result<()> {
        let options = target.options_for(repository);
        if options.repository_identifier.is_empty() {
            env.warn(format!(
                "MIGRATE-SKIP: {}: no GitHub repository identifier",
                repository.path.display()
            ));
            return Ok(());
        }

        if env.dry_run {
            env.output.line(format!(
                "PLAN-MIGRATE: {} ({}) {} -> {}",
                repository.path.display(),
                options.repository_identifier,
                options.source_branch,
                options.target_branch
            ));
            return Ok(());
        }

        let prompt = format!(
            "Migrate {} from {} to {}?",
            options.repository_identifier, options.source_branch, options.target_branch
        );
        if !env.confirm(&prompt)? {
            tracing::info!(repository = %options.repository_identifier, "branch migration declined");
            return Ok(());
        }

        let service = MigrationService::new(
            env.git_executor.clone(),
            env.repository_manager.clone(),
            env.github_client.clone(),
            env.file_system.clone(),
        );
        let result = match service.execute(ctx, &options).await {
            Ok(result) => result,
            Err(e) => {
                let error = anyhow::Error::new(e).context(format!("migrating {}", options.repository_identifier));
                return handle_repository_failure(env, "MIGRATE-FAILED", error);
            }
        };

        for warning in &result.warnings {
            env.warn(warning);
        }
        let mut line = format!(
            "MIGRATED: {} ({}) {} -> {} safe_to_delete={}",
            repository.path.display(),
            options.repository_identifier,
            options.source_branch,
            options.target_branch,
            result.safety_status.safe_to_delete
        );
        if !result.safety_status.blocking_reasons.is_empty() {
            line.push_str(&format!(" blocked_by=[{}]", result.safety_status.blocking_reasons.join("; ")));
        }
        env.output.line(line);

        repository
            .refresh(ctx, env)
            .await
            .with_context(|| format!("refreshing {}", repository.path.display()))
    }
}

#[async_trait]
impl Operation for MigrateBranchOperation {
    fn name(&self) -> &'static str {
        MIGRATE_BRANCH
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        for target in &self.targets {
            let mut matched = false;
            for repository in state.repositories.iter_mut().filter(|r| target.selector.matches(r)) {
                matched = true;
                self.migrate(ctx, env, target, repository).await?;
            }
            if !matched {
                env.warn(format!(
                    "MIGRATE-SKIP: {}: no discovered repository matches",
                    target.selector
                ));
            }
        }
        Ok(())
    }
}
