use super::remotes::{build_remote_url, OwnerRepository, RemoteProtocol};
use super::{git_failure, OperationError, OperationErrorKind, RepositoryOperationError};
use crate::external::RepositoryManager;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub const OPERATION: &str = "convert-protocol";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConversionOptions {
    pub repository_path: PathBuf,
    pub owner_repository: OwnerRepository,
    pub current_protocol: RemoteProtocol,
    pub target_protocol: RemoteProtocol,
}

impl ProtocolConversionOptions {
    pub fn target_url(&self) -> Result<String, OperationError> {
        build_remote_url(self.target_protocol, &self.owner_repository).ok_or_else(|| {
            OperationError::new(
                OPERATION,
                &self.repository_path,
                OperationErrorKind::InvalidRemote,
                format!("unsupported target protocol {}", self.target_protocol),
            )
        })
    }
}

/// Rewrite origin into the target protocol; returns the new URL
pub async fn convert_protocol(
    ctx: &CancellationToken,
    manager: &dyn RepositoryManager,
    options: &ProtocolConversionOptions,
) -> Result<String, RepositoryOperationError> {
    let url = options.target_url()?;
    manager
        .set_remote_url(ctx, &options.repository_path, "origin", &url)
        .await
        .map_err(|e| git_failure(OPERATION, &options.repository_path, e))?;
    tracing::info!(
        path = %options.repository_path.display(),
        from = %options.current_protocol,
        to = %options.target_protocol,
        "origin protocol converted"
    );
    Ok(url)
}
