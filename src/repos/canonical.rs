use super::remotes::{build_remote_url, OwnerRepository, RemoteProtocol};
use super::{git_failure, OperationError, OperationErrorKind, RepositoryOperationError};
use crate::external::RepositoryManager;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub const OPERATION: &str = "update-canonical-remote";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRemoteOptions {
    pub repository_path: PathBuf,
    pub current_protocol: RemoteProtocol,
    pub canonical: OwnerRepository,
}

impl CanonicalRemoteOptions {
    /// Target origin URL in the repository's current protocol
    pub fn target_url(&self) -> Result<String, OperationError> {
        build_remote_url(self.current_protocol, &self.canonical).ok_or_else(|| {
            OperationError::new(
                OPERATION,
                &self.repository_path,
                OperationErrorKind::InvalidRemote,
                format!("cannot build a canonical URL for protocol {}", self.current_protocol),
            )
        })
    }
}

/// Point origin at the canonical repository; returns the new URL
pub async fn update_canonical_remote(
    ctx: &CancellationToken,
    manager: &dyn RepositoryManager,
    options: &CanonicalRemoteOptions,
) -> Result<String, RepositoryOperationError> {
    let url = options.target_url()?;
    manager
        .set_remote_url(ctx, &options.repository_path, "origin", &url)
        .await
        .map_err(|e| git_failure(OPERATION, &options.repository_path, e))?;
    tracing::info!(path = %options.repository_path.display(), url = %url, "origin updated to canonical remote");
    Ok(url)
}
