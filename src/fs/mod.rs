/// File system operations abstraction for testing
///
/// This module provides a trait-based abstraction over the handful of file
/// system calls the workflow operations make, so renames, task file writes
/// and workflow rewrites can be observed and mocked in tests using the
/// `mockall` crate.
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[cfg(test)]
use mockall::automock;

pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;
pub const DEFAULT_DIRECTORY_PERMISSIONS: u32 = 0o755;

/// Identity of a file system entry; two paths with equal identity name the
/// same underlying entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIdentity {
    Inode { device: u64, inode: u64 },
    Canonical(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub len: u64,
    /// Permission bits (`0o777` mask)
    pub permissions: u32,
    pub identity: FileIdentity,
}

/// Trait for file system operations that can be mocked in tests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `contents`, creating or truncating the file, then apply `permissions`
    async fn write_file(&self, path: &Path, contents: &[u8], permissions: u32) -> io::Result<()>;

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn mkdir_all(&self, path: &Path, permissions: u32) -> io::Result<()>;

    /// Regular files anywhere below `directory`, sorted by path
    async fn list_files(&self, directory: &Path) -> io::Result<Vec<PathBuf>>;

    fn abs(&self, path: &Path) -> io::Result<PathBuf>;
}

/// True when both stats describe the same entry
pub fn same_file(left: &FileStat, right: &FileStat) -> bool {
    left.identity == right.identity
}

/// Standard implementation backed by tokio::fs
pub struct OsFileSystem;

#[cfg(unix)]
fn identity_of(_path: &Path, metadata: &std::fs::Metadata) -> io::Result<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Ok(FileIdentity::Inode {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn identity_of(path: &Path, _metadata: &std::fs::Metadata) -> io::Result<FileIdentity> {
    Ok(FileIdentity::Canonical(std::fs::canonicalize(path)?))
}

#[cfg(unix)]
fn permissions_of(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions_of(_metadata: &std::fs::Metadata) -> u32 {
    DEFAULT_FILE_PERMISSIONS
}

#[cfg(unix)]
async fn apply_permissions(path: &Path, permissions: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(permissions)).await
}

#[cfg(not(unix))]
async fn apply_permissions(_path: &Path, _permissions: u32) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            permissions: permissions_of(&metadata),
            identity: identity_of(path, &metadata)?,
        })
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8], permissions: u32) -> io::Result<()> {
        tokio::fs::write(path, contents).await?;
        apply_permissions(path, permissions).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn mkdir_all(&self, path: &Path, permissions: u32) -> io::Result<()> {
        let existed = tokio::fs::metadata(path).await.is_ok();
        tokio::fs::create_dir_all(path).await?;
        if existed {
            return Ok(());
        }
        apply_permissions(path, permissions).await
    }

    async fn list_files(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        let directory = directory.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for entry in WalkDir::new(&directory).sort_by_file_name() {
                let entry = entry.map_err(io::Error::other)?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Ok::<_, io::Error>(files)
        })
        .await
        .map_err(io::Error::other)?
    }

    fn abs(&self, path: &Path) -> io::Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }
}
