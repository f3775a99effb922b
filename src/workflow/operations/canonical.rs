use super::{Operation, UPDATE_CANONICAL_REMOTE};
use crate::repos::canonical::{update_canonical_remote, CanonicalRemoteOptions};
use crate::repos::remotes::OwnerRepository;
use crate::repos::{OperationError, OperationErrorKind};
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
struct CanonicalOptions {
    #[serde(default)]
    owner: Option<String>,
}

/// Points origin at the GitHub-verified repository when they differ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRemoteOperation {
    /// Only touch repositories whose canonical owner matches
    pub owner: Option<String>,
}

impl CanonicalRemoteOperation {
    pub fn from_options(options: &OptionMap, _context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: CanonicalOptions = decode_options(UPDATE_CANONICAL_REMOTE, options)?;
        Ok(Box::new(Self {
            owner: raw.owner.map(|o| o.trim().to_string()).filter(|o| !o.is_empty()),
        }))
    }
}

#[async_trait]
impl Operation for CanonicalRemoteOperation {
    fn name(&self) -> &'static str {
        UPDATE_CANONICAL_REMOTE
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        for repository in state.repositories.iter_mut() {
            let inspection = &repository.inspection;
            if inspection.origin_url.is_empty()
                || inspection.canonical_owner_repo.is_empty()
                || inspection.origin_matches_canonical() == Some(true)
            {
                continue;
            }
            let canonical = match OwnerRepository::parse(&inspection.canonical_owner_repo) {
                Ok(canonical) => canonical,
                Err(e) => {
                    let error = OperationError::new(
                        UPDATE_CANONICAL_REMOTE,
                        &repository.path,
                        OperationErrorKind::InvalidRemote,
                        e.to_string(),
                    );
                    handle_repository_failure(env, "UPDATE-REMOTE-FAILED", error.into())?;
                    continue;
                }
            };
            if let Some(owner) = &self.owner {
                if !canonical.owner().eq_ignore_ascii_case(owner) {
                    continue;
                }
            }

            let options = CanonicalRemoteOptions {
                repository_path: repository.path.clone(),
                current_protocol: inspection.remote_protocol,
                canonical,
            };
            if env.dry_run {
                env.output.line(format!(
                    "PLAN-UPDATE-REMOTE: {} {} -> {}",
                    repository.path.display(),
                    inspection.origin_url,
                    options.target_url().unwrap_or_default()
                ));
                continue;
            }

            match update_canonical_remote(ctx, env.repository_manager.as_ref(), &options).await {
                Ok(url) => {
                    env.output.line(format!("UPDATED-REMOTE: {} -> {url}", repository.path.display()));
                    repository.refresh(ctx, env).await?;
                }
                Err(e) => handle_repository_failure(env, "UPDATE-REMOTE-FAILED", e.into())?,
            }
        }
        Ok(())
    }
}
