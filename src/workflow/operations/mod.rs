//! Workflow operations
//!
//! One `Operation` per workflow step. Each iterates the run's repositories
//! in discovery order, prints previews in dry-run mode, delegates the actual
//! mutation to `repos`, `tasks` or `migrate`, and routes per-repository
//! failures through `handle_repository_failure`.

pub mod audit;
pub mod canonical;
pub mod migrate;
pub mod protocol;
pub mod release;
pub mod rename;
pub mod tasks;

use super::state::{Environment, State};
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

pub use audit::AuditReportOperation;
pub use canonical::CanonicalRemoteOperation;
pub use migrate::{MigrateBranchOperation, MigrationTarget, TargetSelector};
pub use protocol::ProtocolConversionOperation;
pub use release::ReleaseTagOperation;
pub use rename::RenameDirectoriesOperation;
pub use tasks::ApplyTasksOperation;

pub const CONVERT_PROTOCOL: &str = "convert-protocol";
pub const UPDATE_CANONICAL_REMOTE: &str = "update-canonical-remote";
pub const RENAME_DIRECTORIES: &str = "rename-directories";
pub const MIGRATE_BRANCH: &str = "migrate-branch";
pub const AUDIT_REPORT: &str = "audit-report";
pub const APPLY_TASKS: &str = "apply-tasks";
pub const RELEASE_TAG: &str = "release-tag";

#[async_trait]
pub trait Operation: Send + Sync + fmt::Debug {
    /// Operation type as written in the workflow document
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()>;
}
