use super::{build_dependencies, cancel_on_interrupt, runtime_options, Command};
use crate::config::RepoflowConfig;
use crate::workflow::{build_operations, load_configuration, BuildContext, Executor, OperationRegistry, PathSanitizer};
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct WorkflowCommand {
    pub settings: RepoflowConfig,
    pub config_path: PathBuf,
    pub roots: Vec<String>,
    pub dry_run: bool,
    pub yes: bool,
}

impl WorkflowCommand {
    pub fn new(settings: RepoflowConfig, config_path: PathBuf, roots: Vec<String>) -> Self {
        Self {
            settings,
            config_path,
            roots,
            dry_run: false,
            yes: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_yes(mut self, yes: bool) -> Self {
        self.yes = yes;
        self
    }
}

impl Command for WorkflowCommand {
    async fn execute(&self) -> Result<()> {
        let configuration = load_configuration(&self.config_path)?;
        let sanitizer = PathSanitizer::from_environment().context("resolving working directory")?;
        let context = BuildContext {
            sanitizer: sanitizer.clone(),
        };
        let operations = build_operations(&configuration, &OperationRegistry::with_builtins(), &context)?;

        let executor = Executor::new(operations, build_dependencies(&self.settings)).with_sanitizer(sanitizer);
        tracing::info!(
            config = %self.config_path.display(),
            operations = ?executor.operation_names(),
            dry_run = self.dry_run,
            "starting workflow"
        );
        let state = executor
            .execute(
                &cancel_on_interrupt(),
                &self.roots,
                runtime_options(&self.settings, self.dry_run, self.yes),
            )
            .await?;
        tracing::info!(repositories = state.repositories.len(), "workflow complete");
        Ok(())
    }
}
