use super::{Operation, CONVERT_PROTOCOL};
use crate::repos::protocol::{convert_protocol, ProtocolConversionOptions};
use crate::repos::remotes::{OwnerRepository, RemoteProtocol};
use crate::repos::{OperationError, OperationErrorKind};
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
struct ProtocolOptions {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

/// Rewrites origin URLs from one protocol to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConversionOperation {
    pub from: RemoteProtocol,
    pub to: RemoteProtocol,
}

impl ProtocolConversionOperation {
    pub fn new(from: RemoteProtocol, to: RemoteProtocol) -> Result<Self, ConfigurationError> {
        if from == to {
            return Err(ConfigurationError::invalid(
                CONVERT_PROTOCOL,
                format!("from and to must differ (both {from})"),
            ));
        }
        Ok(Self { from, to })
    }

    pub fn from_options(options: &OptionMap, _context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: ProtocolOptions = decode_options(CONVERT_PROTOCOL, options)?;
        let parse = |field: &str, value: &str| {
            if value.trim().is_empty() {
                return Err(ConfigurationError::invalid(CONVERT_PROTOCOL, format!("{field} is required")));
            }
            value
                .parse::<RemoteProtocol>()
                .map_err(|e| ConfigurationError::invalid(CONVERT_PROTOCOL, format!("{field}: {e}")))
        };
        let from = parse("from", &raw.from)?;
        let to = parse("to", &raw.to)?;
        Ok(Box::new(Self::new(from, to)?))
    }
}

#[async_trait]
impl Operation for ProtocolConversionOperation {
    fn name(&self) -> &'static str {
        CONVERT_PROTOCOL
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        for repository in state.repositories.iter_mut() {
            let inspection = &repository.inspection;
            if inspection.origin_url.is_empty() || inspection.remote_protocol != self.from {
                continue;
            }
            let owner_repository = match OwnerRepository::parse(&inspection.origin_owner_repo) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let error = OperationError::new(
                        CONVERT_PROTOCOL,
                        &repository.path,
                        OperationErrorKind::InvalidRemote,
                        e.to_string(),
                    );
                    handle_repository_failure(env, "CONVERT-FAILED", error.into())?;
                    continue;
                }
            };
            let options = ProtocolConversionOptions {
                repository_path: repository.path.clone(),
                owner_repository,
                current_protocol: self.from,
                target_protocol: self.to,
            };

            if env.dry_run {
                let target = options.target_url().unwrap_or_default();
                env.output.line(format!(
                    "PLAN-CONVERT: {} {} -> {} ({})",
                    repository.path.display(),
                    self.from,
                    self.to,
                    target
                ));
                continue;
            }

            let prompt = format!(
                "Convert origin of {} from {} to {}?",
                repository.path.display(),
                self.from,
                self.to
            );
            if !env.confirm(&prompt)? {
                tracing::info!(path = %repository.path.display(), "protocol conversion declined");
                continue;
            }

            match convert_protocol(ctx, env.repository_manager.as_ref(), &options).await {
                Ok(url) => {
                    env.output.line(format!("CONVERTED: {} -> {url}", repository.path.display()));
                    repository.refresh(ctx, env).await?;
                }
                Err(e) => handle_repository_failure(env, "CONVERT-FAILED", e.into())?,
            }
        }
        Ok(())
    }
}
