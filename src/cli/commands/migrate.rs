use super::{build_dependencies, cancel_on_interrupt, runtime_options, Command};
use crate::config::RepoflowConfig;
use crate::workflow::operations::{MigrateBranchOperation, MigrationTarget, TargetSelector};
use crate::workflow::{Executor, Operation};
use anyhow::{bail, Result};

/// Standalone branch migration over every discovered repository
pub struct MigrateCommand {
    pub settings: RepoflowConfig,
    pub roots: Vec<String>,
    pub target: MigrationTarget,
    pub dry_run: bool,
    pub yes: bool,
}

impl MigrateCommand {
    pub fn new(settings: RepoflowConfig, roots: Vec<String>) -> Self {
        Self {
            settings,
            roots,
            target: MigrationTarget::new(TargetSelector::All),
            dry_run: false,
            yes: false,
        }
    }

    pub fn with_branches(mut self, from: String, to: String) -> Self {
        self.target.source_branch = from;
        self.target.target_branch = to;
        self
    }

    pub fn with_remote(mut self, remote: String, workflows_directory: String, push: bool) -> Self {
        self.target.remote = remote;
        self.target.workflows_directory = workflows_directory;
        self.target.push = push;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_yes(mut self, yes: bool) -> Self {
        self.yes = yes;
        self
    }

    fn operation(&self) -> Result<Box<dyn Operation>> {
        if self.target.source_branch.trim() == self.target.target_branch.trim() {
            bail!(
                "--from and --to must differ (both {})",
                self.target.source_branch
            );
        }
        Ok(Box::new(MigrateBranchOperation::new(vec![self.target.clone()])))
    }
}

impl Command for MigrateCommand {
    async fn execute(&self) -> Result<()> {
        let executor = Executor::new(vec![self.operation()?], build_dependencies(&self.settings));
        executor
            .execute(
                &cancel_on_interrupt(),
                &self.roots,
                runtime_options(&self.settings, self.dry_run, self.yes),
            )
            .await?;
        Ok(())
    }
}
