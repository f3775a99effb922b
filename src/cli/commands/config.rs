use super::Command;
use crate::config::RepoflowConfig;
use anyhow::Result;

/// Prints the effective settings
pub struct ConfigShowCommand {
    pub settings: RepoflowConfig,
}

impl ConfigShowCommand {
    pub fn new(settings: RepoflowConfig) -> Self {
        Self { settings }
    }
}

impl Command for ConfigShowCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", self.settings.to_toml()?);
        Ok(())
    }
}
