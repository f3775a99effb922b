use super::{Operation, RELEASE_TAG};
use crate::migrate::DEFAULT_REMOTE;
use crate::repos::release::{create_release, ReleaseOptions};
use crate::workflow::config::OptionMap;
use crate::workflow::errors::ConfigurationError;
use crate::workflow::outcome::handle_repository_failure;
use crate::workflow::registry::{decode_options, BuildContext};
use crate::workflow::state::{Environment, State};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReleaseStepOptions {
    #[serde(default)]
    tag: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    remote: Option<String>,
}

/// Tags every repository with an annotated release tag and pushes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTagOperation {
    pub tag: String,
    pub message: String,
    pub remote: String,
}

impl ReleaseTagOperation {
    pub fn from_options(options: &OptionMap, _context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: ReleaseStepOptions = decode_options(RELEASE_TAG, options)?;
        let tag = raw.tag.trim().to_string();
        if tag.is_empty() {
            return Err(ConfigurationError::invalid(RELEASE_TAG, "tag is required"));
        }
        if tag.contains(char::is_whitespace) {
            return Err(ConfigurationError::invalid(RELEASE_TAG, format!("tag '{tag}' contains whitespace")));
        }
        let message = raw
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Release {tag}"));
        let remote = raw
            .remote
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
        Ok(Box::new(Self { tag, message, remote }))
    }
}

#[async_trait]
impl Operation for ReleaseTagOperation {
    fn name(&self) -> &'static str {
        RELEASE_TAG
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        for repository in &state.repositories {
            if env.dry_run {
                env.output.line(format!(
                    "PLAN-RELEASE: {} {} -> {}",
                    repository.path.display(),
                    self.tag,
                    self.remote
                ));
                continue;
            }

            let options = ReleaseOptions {
                repository_path: repository.path.clone(),
                tag: self.tag.clone(),
                message: self.message.clone(),
                remote: self.remote.clone(),
            };
            match create_release(ctx, env.git_executor.as_ref(), &options).await {
                Ok(()) => env
                    .output
                    .line(format!("RELEASED: {} -> {}", repository.path.display(), self.tag)),
                Err(e) => handle_repository_failure(env, "RELEASE-FAILED", e.into())?,
            }
        }
        Ok(())
    }
}
