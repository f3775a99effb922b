use super::{Operation, RENAME_DIRECTORIES};
use crate::repos::git_failure;
use crate::repos::rename::{rename_directory, RenameOptions};
use crate::workflow::config::OptionMap;
use crate::workflow::errors::ConfigurationError;
use crate::workflow::outcome::handle_repository_failure;
use crate::workflow::registry::{decode_options, BuildContext};
use crate::workflow::state::{Environment, State};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenameStepOptions {
    #[serde(default)]
    require_clean: bool,
    #[serde(default)]
    include_owner: bool,
}

/// Renames repository directories to their canonical repository names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameDirectoriesOperation {
    pub require_clean: bool,
    pub include_owner: bool,
}

impl RenameDirectoriesOperation {
    pub fn from_options(options: &OptionMap, _context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: RenameStepOptions = decode_options(RENAME_DIRECTORIES, options)?;
        Ok(Box::new(Self {
            require_clean: raw.require_clean,
            include_owner: raw.include_owner,
        }))
    }
}

#[async_trait]
impl Operation for RenameDirectoriesOperation {
    fn name(&self) -> &'static str {
        RENAME_DIRECTORIES
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        for repository in state.repositories.iter_mut() {
            let inspection = &repository.inspection;
            if inspection.final_github_repo().is_empty() {
                continue;
            }
            let owner = if self.include_owner {
                inspection.canonical().or_else(|| inspection.origin()).map(|o| o.owner().to_string())
            } else {
                None
            };
            let options = RenameOptions {
                repository_path: repository.path.clone(),
                desired_folder_name: inspection.repository_name(),
                owner,
            };
            let Some(destination) = options.destination() else {
                continue;
            };

            if self.require_clean {
                match env.repository_manager.check_clean_worktree(ctx, &repository.path).await {
                    Ok(true) => {}
                    Ok(false) => {
                        env.warn(format!(
                            "RENAME-SKIP: {}: worktree has uncommitted changes",
                            repository.path.display()
                        ));
                        continue;
                    }
                    Err(e) => {
                        handle_repository_failure(
                            env,
                            "RENAME-FAILED",
                            git_failure(RENAME_DIRECTORIES, &repository.path, e).into(),
                        )?;
                        continue;
                    }
                }
            }

            if env.dry_run {
                env.output.line(format!(
                    "PLAN-RENAME: {} -> {}",
                    repository.path.display(),
                    destination.display()
                ));
                continue;
            }

            let prompt = format!("Rename {} to {}?", repository.path.display(), destination.display());
            if !env.confirm(&prompt)? {
                tracing::info!(path = %repository.path.display(), "rename declined");
                continue;
            }

            match rename_directory(env.file_system.as_ref(), &options).await {
                Ok(renamed) => {
                    env.output.line(format!(
                        "RENAMED: {} -> {}",
                        repository.path.display(),
                        renamed.display()
                    ));
                    repository.path = renamed;
                    repository.refresh(ctx, env).await?;
                }
                Err(e) => handle_repository_failure(env, "RENAME-FAILED", e.into())?,
            }
        }
        Ok(())
    }
}
