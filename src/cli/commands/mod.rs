use crate::audit::GitInspector;
use crate::config::RepoflowConfig;
use crate::external::{GhCliClient, GitExecutor, GitRepositoryManager, ProcessCommandExecutor, ShellGitExecutor};
use crate::workflow::{Dependencies, RuntimeOptions};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod audit;
pub mod config;
pub mod migrate;
pub mod workflow;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Real git/gh backed collaborators configured from application settings
pub fn build_dependencies(settings: &RepoflowConfig) -> Dependencies {
    let executor: Arc<dyn GitExecutor> = Arc::new(
        ShellGitExecutor::new(Arc::new(ProcessCommandExecutor))
            .with_binaries(&settings.git.binary, &settings.github.binary),
    );
    let manager = Arc::new(GitRepositoryManager::new(executor.clone()));
    let github = Arc::new(GhCliClient::new(executor.clone()));
    let inspector = Arc::new(GitInspector::new(executor.clone(), manager.clone(), github.clone()));

    Dependencies {
        git_executor: Some(executor),
        repository_manager: Some(manager),
        github_client: Some(github),
        inspector: Some(inspector),
        ..Dependencies::default()
    }
}

/// `--yes` on the command line or `workflow.assume_yes` in settings
pub fn runtime_options(settings: &RepoflowConfig, dry_run: bool, yes: bool) -> RuntimeOptions {
    RuntimeOptions {
        dry_run,
        assume_yes: yes || settings.workflow.assume_yes,
    }
}

/// Token cancelled on Ctrl-C so in-flight git/gh commands are stopped
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            child.cancel();
        }
    });
    token
}
