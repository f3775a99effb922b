use super::{io_failure, OperationError, OperationErrorKind, RepositoryOperationError};
use crate::fs::{same_file, FileSystem, DEFAULT_DIRECTORY_PERMISSIONS};
use std::path::{Path, PathBuf};

pub const OPERATION: &str = "rename-directories";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOptions {
    pub repository_path: PathBuf,
    pub desired_folder_name: String,
    /// Owner directory to nest the repository under, when requested
    pub owner: Option<String>,
}

impl RenameOptions {
    /// Destination directory, or `None` when the repository is already in place
    pub fn destination(&self) -> Option<PathBuf> {
        let parent = self.repository_path.parent()?;
        let parent_name = parent.file_name().map(|n| n.to_string_lossy().to_string());
        let base = match &self.owner {
            Some(owner) if parent_name.as_deref() != Some(owner.as_str()) => parent.join(owner),
            _ => parent.to_path_buf(),
        };
        let destination = base.join(&self.desired_folder_name);
        (destination != self.repository_path).then_some(destination)
    }
}

/// Move the repository directory and verify the move took effect
pub async fn rename_directory(
    file_system: &dyn FileSystem,
    options: &RenameOptions,
) -> Result<PathBuf, RepositoryOperationError> {
    let source = &options.repository_path;
    let Some(destination) = options.destination() else {
        return Ok(source.clone());
    };

    let original = file_system
        .stat(source)
        .await
        .map_err(|e| io_failure(OPERATION, source, "stat source", e))?;

    // A case-only rename resolves to the same entry on case-insensitive file systems
    if let Ok(existing) = file_system.stat(&destination).await {
        if !same_file(&original, &existing) {
            return Err(OperationError::new(
                OPERATION,
                source,
                OperationErrorKind::TargetExists,
                format!("destination {} already exists", destination.display()),
            )
            .into());
        }
    }

    if let Some(parent) = destination.parent() {
        file_system
            .mkdir_all(parent, DEFAULT_DIRECTORY_PERMISSIONS)
            .await
            .map_err(|e| io_failure(OPERATION, source, "create parent directory", e))?;
    }
    file_system
        .rename(source, &destination)
        .await
        .map_err(|e| io_failure(OPERATION, source, "rename", e))?;

    verify_rename(file_system, source, &destination, &original).await?;
    tracing::info!(from = %source.display(), to = %destination.display(), "repository directory renamed");
    Ok(destination)
}

async fn verify_rename(
    file_system: &dyn FileSystem,
    source: &Path,
    destination: &Path,
    original: &crate::fs::FileStat,
) -> Result<(), RepositoryOperationError> {
    let moved = file_system
        .stat(destination)
        .await
        .map_err(|e| io_failure(OPERATION, source, "stat destination", e))?;
    if same_file(original, &moved) {
        Ok(())
    } else {
        Err(OperationError::new(
            OPERATION,
            source,
            OperationErrorKind::RenameNotApplied,
            format!("{} does not refer to the renamed repository", destination.display()),
        )
        .into())
    }
}
