//! Workflow executor
//!
//! Resolves roots, discovers repositories once, then runs every operation in
//! declaration order against the shared `State`. The first operation error
//! aborts the run.

use super::errors::WorkflowError;
use super::operations::Operation;
use super::sanitize::PathSanitizer;
use super::state::{Environment, OutputSink, RepositoryState, RuntimeOptions, State};
use crate::audit::{InspectionDepth, RepositoryInspector};
use crate::external::{GitExecutor, GitHubClient, RepositoryManager};
use crate::fs::{FileSystem, OsFileSystem};
use crate::prompt::{ConfirmationPrompter, PromptState, StdinPrompter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Collaborators handed to the executor. The first four are required; the
/// rest fall back to the real file system, stdin prompts and stdout/stderr.
#[derive(Default, Clone)]
pub struct Dependencies {
    pub git_executor: Option<Arc<dyn GitExecutor>>,
    pub repository_manager: Option<Arc<dyn RepositoryManager>>,
    pub github_client: Option<Arc<dyn GitHubClient>>,
    pub inspector: Option<Arc<dyn RepositoryInspector>>,
    pub file_system: Option<Arc<dyn FileSystem>>,
    pub prompter: Option<Arc<dyn ConfirmationPrompter>>,
    pub output: Option<OutputSink>,
    pub errors: Option<OutputSink>,
}

pub struct Executor {
    operations: Vec<Box<dyn Operation>>,
    dependencies: Dependencies,
    sanitizer: Option<PathSanitizer>,
}

impl Executor {
    pub fn new(operations: Vec<Box<dyn Operation>>, dependencies: Dependencies) -> Self {
        Self {
            operations,
            dependencies,
            sanitizer: None,
        }
    }

    /// Resolve roots against `sanitizer` instead of the process environment
    pub fn with_sanitizer(mut self, sanitizer: PathSanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|o| o.name()).collect()
    }

    fn environment(&self, options: RuntimeOptions) -> Result<Environment, WorkflowError> {
        let deps = &self.dependencies;
        let git_executor = deps
            .git_executor
            .clone()
            .ok_or(WorkflowError::MissingCollaborator("git executor"))?;
        let repository_manager = deps
            .repository_manager
            .clone()
            .ok_or(WorkflowError::MissingCollaborator("repository manager"))?;
        let github_client = deps
            .github_client
            .clone()
            .ok_or(WorkflowError::MissingCollaborator("GitHub client"))?;
        let inspector = deps
            .inspector
            .clone()
            .ok_or(WorkflowError::MissingCollaborator("repository inspector"))?;

        Ok(Environment {
            git_executor,
            repository_manager,
            github_client,
            inspector,
            file_system: deps.file_system.clone().unwrap_or_else(|| Arc::new(OsFileSystem)),
            prompter: deps.prompter.clone().unwrap_or_else(|| Arc::new(StdinPrompter)),
            prompt_state: PromptState::new(options.assume_yes),
            output: deps.output.clone().unwrap_or_else(OutputSink::stdout),
            errors: deps.errors.clone().unwrap_or_else(OutputSink::stderr),
            dry_run: options.dry_run,
        })
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        roots: &[String],
        options: RuntimeOptions,
    ) -> Result<State, WorkflowError> {
        let env = self.environment(options)?;
        let sanitizer = match &self.sanitizer {
            Some(sanitizer) => sanitizer.clone(),
            None => PathSanitizer::from_environment().map_err(WorkflowError::Sanitize)?,
        };
        let roots = sanitizer.sanitize_roots(roots);

        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "workflow_run",
            run.id = %run_id,
            dry_run = options.dry_run,
            operations = self.operations.len()
        );
        async move {
            let inspections = env
                .inspector
                .inspect(ctx, &roots, InspectionDepth::Full)
                .await
                .map_err(WorkflowError::Discovery)?;
            tracing::info!(roots = roots.len(), repositories = inspections.len(), "repositories discovered");

            let mut state = State {
                roots,
                repositories: inspections.into_iter().map(RepositoryState::new).collect(),
            };

            for (index, operation) in self.operations.iter().enumerate() {
                let name = operation.name();
                if env.dry_run {
                    env.output.line(format!("WORKFLOW-PLAN: step {}: {name}", index + 1));
                }
                let span = tracing::info_span!("workflow_operation", operation = name, step = index + 1);
                operation
                    .execute(ctx, &env, &mut state)
                    .instrument(span)
                    .await
                    .map_err(|source| WorkflowError::OperationFailed {
                        name: name.to_string(),
                        source,
                    })?;
            }

            tracing::info!(repositories = state.repositories.len(), "workflow finished");
            Ok::<_, WorkflowError>(state)
        }
        .instrument(span)
        .await
    }
}
