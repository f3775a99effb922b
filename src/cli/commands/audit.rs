use super::{build_dependencies, cancel_on_interrupt, Command};
use crate::config::RepoflowConfig;
use crate::workflow::operations::AuditReportOperation;
use crate::workflow::{Executor, PathSanitizer, RuntimeOptions};
use anyhow::{Context, Result};

pub struct AuditCommand {
    pub settings: RepoflowConfig,
    pub roots: Vec<String>,
    pub output: Option<String>,
}

impl AuditCommand {
    pub fn new(settings: RepoflowConfig, roots: Vec<String>, output: Option<String>) -> Self {
        Self { settings, roots, output }
    }
}

impl Command for AuditCommand {
    async fn execute(&self) -> Result<()> {
        let sanitizer = PathSanitizer::from_environment().context("resolving working directory")?;
        let operation = AuditReportOperation {
            output: self.output.as_deref().and_then(|o| sanitizer.sanitize(o)),
        };
        let executor =
            Executor::new(vec![Box::new(operation)], build_dependencies(&self.settings)).with_sanitizer(sanitizer);
        executor
            .execute(&cancel_on_interrupt(), &self.roots, RuntimeOptions::default())
            .await?;
        Ok(())
    }
}
