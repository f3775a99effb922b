// Test doubles shared by the unit tests - no side effects beyond the
// temp directories a test creates itself.

use crate::audit::{InspectionDepth, RepositoryInspection, RepositoryInspector};
use crate::external::{
    CommandDetails, CommandError, CommandOutput, GitExecutor, GitHubClient, GitHubError, GitRepositoryManager,
    NewPullRequest, PagesConfiguration, PagesStatus, PullRequest, PullRequestListOptions, RepositoryMetadata,
};
use crate::fs::{FileSystem, OsFileSystem};
use crate::prompt::{ConfirmationPrompter, PromptResult, PromptState};
use crate::repos::remotes::RemoteProtocol;
use crate::workflow::state::{Environment, OutputSink, SharedBuffer};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub program: &'static str,
    pub arguments: String,
    pub working_directory: Option<PathBuf>,
}

/// Records every git/gh invocation and replays scripted responses keyed by
/// the space-joined argument list. Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct RecordingGitExecutor {
    commands: Mutex<Vec<RecordedCommand>>,
    git_responses: Mutex<HashMap<String, VecDeque<Result<String, CommandError>>>>,
    gh_responses: Mutex<HashMap<String, VecDeque<Result<String, CommandError>>>>,
}

impl RecordingGitExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure(stderr: &str) -> CommandError {
        CommandError::Failed {
            program: "git".to_string(),
            arguments: String::new(),
            status_code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Queue a response; the last queued response for a key repeats
    pub fn respond_git(&self, arguments: &str, response: Result<String, CommandError>) {
        self.git_responses
            .lock()
            .unwrap()
            .entry(arguments.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn respond_gh(&self, arguments: &str, response: Result<String, CommandError>) {
        self.gh_responses
            .lock()
            .unwrap()
            .entry(arguments.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn git_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.program == "git")
            .map(|c| c.arguments)
            .collect()
    }

    fn next_response(
        responses: &Mutex<HashMap<String, VecDeque<Result<String, CommandError>>>>,
        key: &str,
    ) -> Result<String, CommandError> {
        let mut responses = responses.lock().unwrap();
        match responses.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(String::new())),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(String::new())),
            None => Ok(String::new()),
        }
    }

    fn record(
        &self,
        ctx: &CancellationToken,
        program: &'static str,
        details: &CommandDetails,
        responses: &Mutex<HashMap<String, VecDeque<Result<String, CommandError>>>>,
    ) -> Result<CommandOutput, CommandError> {
        let arguments = details.arguments.join(" ");
        if ctx.is_cancelled() {
            return Err(CommandError::Cancelled { command: arguments });
        }
        self.commands.lock().unwrap().push(RecordedCommand {
            program,
            arguments: arguments.clone(),
            working_directory: details.working_directory.clone(),
        });
        let stdout = Self::next_response(responses, &arguments)?;
        Ok(CommandOutput {
            status_code: 0,
            stdout,
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl GitExecutor for RecordingGitExecutor {
    async fn execute_git(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        self.record(ctx, "git", &details, &self.git_responses)
    }

    async fn execute_github_cli(
        &self,
        ctx: &CancellationToken,
        details: CommandDetails,
    ) -> Result<CommandOutput, CommandError> {
        self.record(ctx, "gh", &details, &self.gh_responses)
    }
}

/// Scriptable GitHub client recording every call as a short string
#[derive(Default)]
pub struct FakeGitHubClient {
    pub calls: Mutex<Vec<String>>,
    pub pull_requests: Mutex<Vec<PullRequest>>,
    pub pages: Mutex<Option<Result<PagesStatus, String>>>,
    pub pages_update_error: Mutex<Option<String>>,
    pub protection: Mutex<Option<Result<bool, String>>>,
    pub default_branch_error: Mutex<Option<String>>,
    pub list_error: Mutex<Option<String>>,
    pub retarget_failures: Mutex<HashSet<u64>>,
    pub create_pr_error: Mutex<Option<String>>,
    pub metadata: Mutex<HashMap<String, RepositoryMetadata>>,
    /// Cancel the caller's token when this call kind (`pages`, `retarget`, ...) is reached
    pub cancel_during: Mutex<Option<&'static str>>,
}

impl FakeGitHubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Record the call, then fail the way `gh` does once the token is cancelled
    fn enter(&self, ctx: &CancellationToken, call: String) -> Result<(), GitHubError> {
        let kind = call.split_whitespace().next().unwrap_or_default().to_string();
        self.record(call.clone());
        if self.cancel_during.lock().unwrap().is_some_and(|k| k == kind) {
            ctx.cancel();
        }
        if ctx.is_cancelled() {
            return Err(GitHubError::CommandError {
                source: CommandError::Cancelled { command: call },
            });
        }
        Ok(())
    }

    fn failure(message: &str) -> GitHubError {
        GitHubError::RequestFailed {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl GitHubClient for FakeGitHubClient {
    async fn resolve_repository_metadata(
        &self,
        ctx: &CancellationToken,
        repository: &str,
    ) -> Result<RepositoryMetadata, GitHubError> {
        self.enter(ctx, format!("metadata {repository}"))?;
        self.metadata
            .lock()
            .unwrap()
            .get(repository)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound {
                resource: repository.to_string(),
            })
    }

    async fn list_pull_requests(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        options: &PullRequestListOptions,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        self.enter(ctx, format!("list-prs {repository} base={}", options.base_branch))?;
        if let Some(message) = self.list_error.lock().unwrap().clone() {
            return Err(Self::failure(&message));
        }
        Ok(self
            .pull_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|pr| pr.base_ref == options.base_branch)
            .cloned()
            .collect())
    }

    async fn update_pull_request_base(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        number: u64,
        base_branch: &str,
    ) -> Result<(), GitHubError> {
        self.enter(ctx, format!("retarget {repository} #{number} -> {base_branch}"))?;
        if self.retarget_failures.lock().unwrap().contains(&number) {
            return Err(Self::failure("base branch update rejected"));
        }
        Ok(())
    }

    async fn create_pull_request(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        request: &NewPullRequest,
    ) -> Result<u64, GitHubError> {
        self.enter(ctx, format!(
            "create-pr {repository} {} -> {} '{}'",
            request.head_branch, request.base_branch, request.title
        ))?;
        if let Some(message) = self.create_pr_error.lock().unwrap().clone() {
            return Err(Self::failure(&message));
        }
        Ok(101)
    }

    async fn set_default_branch(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<(), GitHubError> {
        self.enter(ctx, format!("set-default {repository} {branch}"))?;
        if let Some(message) = self.default_branch_error.lock().unwrap().clone() {
            return Err(Self::failure(&message));
        }
        Ok(())
    }

    async fn check_branch_protection(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        branch: &str,
    ) -> Result<bool, GitHubError> {
        self.enter(ctx, format!("protection {repository} {branch}"))?;
        match self.protection.lock().unwrap().clone() {
            Some(Ok(protected)) => Ok(protected),
            Some(Err(message)) => Err(Self::failure(&message)),
            None => Ok(false),
        }
    }

    async fn get_pages_config(&self, ctx: &CancellationToken, repository: &str) -> Result<PagesStatus, GitHubError> {
        self.enter(ctx, format!("pages {repository}"))?;
        match self.pages.lock().unwrap().clone() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(Self::failure(&message)),
            None => Ok(PagesStatus::default()),
        }
    }

    async fn update_pages_config(
        &self,
        ctx: &CancellationToken,
        repository: &str,
        configuration: &PagesConfiguration,
    ) -> Result<(), GitHubError> {
        self.enter(ctx, format!("update-pages {repository} {}", configuration.source_branch))?;
        if let Some(message) = self.pages_update_error.lock().unwrap().clone() {
            return Err(Self::failure(&message));
        }
        Ok(())
    }
}

/// Inspector returning canned inspections whose path lies under a root
#[derive(Default)]
pub struct FakeInspector {
    inspections: Mutex<Vec<RepositoryInspection>>,
    calls: Mutex<usize>,
}

impl FakeInspector {
    pub fn set(&self, inspections: Vec<RepositoryInspection>) {
        *self.inspections.lock().unwrap() = inspections;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RepositoryInspector for FakeInspector {
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
            .filter(|i| roots.iter().any(|root| i.path.starts_with(root)))
            .cloned()
            .collect())
    }
}

/// Prompter that answers from a script and counts how often it was asked
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<PromptResult>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: Vec<PromptResult>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl ConfirmationPrompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str) -> anyhow::Result<PromptResult> {
        self.asked.lock().unwrap().push(prompt.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}

pub fn sample_inspection(path: &str, owner_repo: &str) -> RepositoryInspection {
    let path = PathBuf::from(path);
    RepositoryInspection {
        folder_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path,
        origin_url: format!("git@github.com:{owner_repo}.git"),
        origin_owner_repo: owner_repo.to_string(),
        canonical_owner_repo: owner_repo.to_string(),
        remote_protocol: RemoteProtocol::Ssh,
        remote_default_branch: "main".to_string(),
        local_branch: "main".to_string(),
        in_sync: None,
    }
}

/// Bundles the fakes and output buffers behind one `Environment`
pub struct TestHarness {
    pub git: Arc<RecordingGitExecutor>,
    pub github: Arc<FakeGitHubClient>,
    pub inspector: Arc<FakeInspector>,
    pub prompter: Arc<ScriptedPrompter>,
    pub file_system: Arc<dyn FileSystem>,
    pub assume_yes: bool,
    output: (OutputSink, SharedBuffer),
    errors: (OutputSink, SharedBuffer),
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            git: Arc::new(RecordingGitExecutor::new()),
            github: Arc::new(FakeGitHubClient::new()),
            inspector: Arc::new(FakeInspector::default()),
            prompter: Arc::new(ScriptedPrompter::default()),
            file_system: Arc::new(OsFileSystem),
            assume_yes: true,
            output: OutputSink::buffer(),
            errors: OutputSink::buffer(),
        }
    }

    pub fn environment(&self, dry_run: bool) -> Environment {
        Environment {
            git_executor: self.git.clone(),
            repository_manager: Arc::new(GitRepositoryManager::new(self.git.clone())),
            github_client: self.github.clone(),
            file_system: self.file_system.clone(),
            inspector: self.inspector.clone(),
            prompter: self.prompter.clone(),
            prompt_state: PromptState::new(self.assume_yes),
            output: self.output.0.clone(),
            errors: self.errors.0.clone(),
            dry_run,
        }
    }

    pub fn output(&self) -> String {
        self.output.1.contents()
    }

    pub fn errors(&self) -> String {
        self.errors.1.contents()
    }
}

pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
