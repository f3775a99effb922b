// Shared fakes for the integration tests. They implement the public
// collaborator traits only, so the engine is exercised through the same
// seams the binary uses.

#![allow(dead_code)]

use async_trait::async_trait;
use repoflow::audit::{InspectionDepth, RepositoryInspection, RepositoryInspector};
use repoflow::external::{
    CommandDetails, CommandError, CommandOutput, GitExecutor, GitHubClient, GitHubError, GitRepositoryManager,
    NewPullRequest, PagesConfiguration, PagesStatus, PullRequest, PullRequestListOptions, RepositoryMetadata,
};
use repoflow::repos::remotes::RemoteProtocol;
use repoflow::workflow::{Dependencies, OutputSink, SharedBuffer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Git commands whose first arguments are read-only queries
const QUERY_PREFIXES: &[&str] = &["status", "rev-parse", "remote get-url", "config --get"];

#[derive(Default)]
pub struct ScriptedGit {
    commands: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
    outputs: Mutex<HashMap<String, String>>,
    cancel_at: Mutex<Option<String>>,
}

impl ScriptedGit {
    pub fn fail(&self, arguments: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(arguments.to_string(), stderr.to_string());
    }

    pub fn output(&self, arguments: &str, stdout: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(arguments.to_string(), stdout.to_string());
    }

    /// Cancel the run's token when `arguments` is executed
    pub fn cancel_at(&self, arguments: &str) {
        *self.cancel_at.lock().unwrap() = Some(arguments.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Commands other than read-only queries
    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| !c.starts_with("gh ") && !QUERY_PREFIXES.iter().any(|p| c.starts_with(p)))
            .collect()
    }

    fn run(&self, ctx: &CancellationToken, key: String) -> Result<CommandOutput, CommandError> {
        if ctx.is_cancelled() {
            return Err(CommandError::Cancelled { command: key });
        }
        self.commands.lock().unwrap().push(key.clone());
        if self.cancel_at.lock().unwrap().as_deref() == Some(key.as_str()) {
            ctx.cancel();
            return Err(CommandError::Cancelled { command: key });
        }
        if let Some(stderr) = self.failures.lock().unwrap().get(&key) {
            return Err(CommandError::Failed {
                program: "git".to_string(),
                arguments: key.clone(),
                status_code: 1,
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }
        Ok(CommandOutput {
            status_code: 0,
            stdout: self.outputs.lock().unwrap().get(&key).cloned().unwrap_or_default(),
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl GitExecutor for ScriptedGit {
    async fn execute_git(&self, ctx: &CancellationToken, details: CommandDetails) -> Result<CommandOutput, CommandError> {
        self.run(ctx, details.arguments.join(" "))
    }

    async fn execute_github_cli(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        self.run(ctx, format!("gh {}", details.arguments.join(" ")))
    }
}

#[derive(Default)]
pub struct RecordingGitHub {
    pub calls: Mutex<Vec<String>>,
    pub open_pull_requests: Mutex<Vec<PullRequest>>,
}

impl RecordingGitHub {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GitHubClient for RecordingGitHub {
    async fn resolve_repository_metadata(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
    ) -> Result<RepositoryMetadata, GitHubError> {
        Err(GitHubError::NotFound {
            resource: repository.to_string(),
        })
    }

    async fn list_pull_requests(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
        options: &PullRequestListOptions,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        self.record(format!("list-prs {repository} {}", options.base_branch));
        Ok(self.open_pull_requests.lock().unwrap().clone())
    }

    async fn update_pull_request_base(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
        number: u64,
        base_branch: &str,
    ) -> Result<(), GitHubError> {
        self.record(format!("retarget {repository}#{number} {base_branch}"));
        Ok(())
    }

    async fn create_pull_request(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
        request: &NewPullRequest,
    ) -> Result<u64, GitHubError> {
        self.record(format!("create-pr {repository} {}", request.head_branch));
        Ok(1)
    }

    async fn set_default_branch(&self, _ctx: &CancellationToken, repository: &str, branch: &str) -> Result<(), GitHubError> {
        self.record(format!("set-default {repository} {branch}"));
        Ok(())
    }

    async fn check_branch_protection(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<bool, GitHubError> {
        self.record(format!("protection {repository} {branch}"));
        Ok(false)
    }

    async fn get_pages_config(&self, _ctx: &CancellationToken, repository: &str) -> Result<PagesStatus, GitHubError> {
        self.record(format!("pages {repository}"));
        Ok(PagesStatus::default())
    }

    async fn update_pages_config(
        &self,
        _ctx: &CancellationToken,
        repository: &str,
        configuration: &PagesConfiguration,
    ) -> Result<(), GitHubError> {
        self.record(format!("update-pages {repository} {}", configuration.source_branch));
        Ok(())
    }
}

/// Serves fixed inspections, counting calls so refreshes are observable
#[derive(Default)]
pub struct StaticInspector {
    pub inspections: Mutex<Vec<RepositoryInspection>>,
    pub calls: Mutex<usize>,
}

impl StaticInspector {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RepositoryInspector for StaticInspector {
    async fn inspect(
        &self,
        _ctx: &CancellationToken,
        roots: &[PathBuf],
        _depth: InspectionDepth,
    ) -> anyhow::Result<Vec<RepositoryInspection>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self
            .inspections
            .lock()
            .unwrap()
            .iter()
            .filter(|i| roots.iter().any(|r| i.path.starts_with(r)))
            .cloned()
            .collect())
    }
}

pub fn inspection(path: &Path, owner_repo: &str, protocol: RemoteProtocol) -> RepositoryInspection {
    let origin_url = match protocol {
        RemoteProtocol::Https => format!("https://github.com/{owner_repo}.git"),
        RemoteProtocol::Git => format!("git://github.com/{owner_repo}.git"),
        _ => format!("git@github.com:{owner_repo}.git"),
    };
    RepositoryInspection {
        path: path.to_path_buf(),
        folder_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        origin_url,
        origin_owner_repo: owner_repo.to_string(),
        canonical_owner_repo: owner_repo.to_string(),
        remote_protocol: protocol,
        remote_default_branch: "main".to_string(),
        local_branch: "main".to_string(),
        in_sync: Some(true),
    }
}

pub struct World {
    pub git: Arc<ScriptedGit>,
    pub github: Arc<RecordingGitHub>,
    pub inspector: Arc<StaticInspector>,
    pub output: SharedBuffer,
    pub errors: SharedBuffer,
    output_sink: OutputSink,
    error_sink: OutputSink,
}

impl World {
    pub fn new(inspections: Vec<RepositoryInspection>) -> Self {
        let (output_sink, output) = OutputSink::buffer();
        let (error_sink, errors) = OutputSink::buffer();
        let inspector = StaticInspector::default();
        *inspector.inspections.lock().unwrap() = inspections;
        Self {
            git: Arc::new(ScriptedGit::default()),
            github: Arc::new(RecordingGitHub::default()),
            inspector: Arc::new(inspector),
            output,
            errors,
            output_sink,
            error_sink,
        }
    }

    pub fn dependencies(&self) -> Dependencies {
        Dependencies {
            git_executor: Some(self.git.clone()),
            repository_manager: Some(Arc::new(GitRepositoryManager::new(self.git.clone()))),
            github_client: Some(self.github.clone()),
            inspector: Some(self.inspector.clone()),
            file_system: None,
            prompter: None,
            output: Some(self.output_sink.clone()),
            errors: Some(self.error_sink.clone()),
        }
    }
}
