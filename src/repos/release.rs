use super::{git_failure, OperationError, OperationErrorKind, RepositoryOperationError};
use crate::external::{CommandDetails, CommandError, GitExecutor};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub const OPERATION: &str = "release-tag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    pub repository_path: PathBuf,
    pub tag: String,
    pub message: String,
    pub remote: String,
}

/// Create an annotated tag and push it
pub async fn create_release(
    ctx: &CancellationToken,
    git: &dyn GitExecutor,
    options: &ReleaseOptions,
) -> Result<(), RepositoryOperationError> {
    let path = &options.repository_path;
    let tag_ref = format!("refs/tags/{}", options.tag);
    let lookup = CommandDetails::new(["rev-parse", "--verify", "--quiet", tag_ref.as_str()]).in_directory(path);
    match git.execute_git(ctx, lookup).await {
        Ok(_) => {
            return Err(OperationError::new(
                OPERATION,
                path,
                OperationErrorKind::TagExists,
                format!("tag {} already exists", options.tag),
            )
            .into())
        }
        Err(CommandError::Failed { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let tag = CommandDetails::new(["tag", "-a", options.tag.as_str(), "-m", options.message.as_str()]).in_directory(path);
    git.execute_git(ctx, tag)
        .await
        .map_err(|e| git_failure(OPERATION, path, e))?;

    let push = CommandDetails::new(["push", options.remote.as_str(), options.tag.as_str()]).in_directory(path);
    git.execute_git(ctx, push)
        .await
        .map_err(|e| git_failure(OPERATION, path, e))?;

    tracing::info!(path = %path.display(), tag = %options.tag, remote = %options.remote, "release tag pushed");
    Ok(())
}
