use super::{Operation, APPLY_TASKS};
use crate::tasks::{TaskDefinition, TaskExecutor, TaskOutcome, TaskPlanner, TemplateRenderer};
use crate::workflow::config::OptionMap;
use crate::workflow::errors::ConfigurationError;
use crate::workflow::outcome::handle_repository_failure;
use crate::workflow::registry::{decode_options, BuildContext};
use crate::workflow::state::{Environment, RepositoryState, State};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TasksOptions {
    #[serde(default)]
    tasks: Vec<TaskDefinition>,
}

/// Plans and applies declarative tasks to every repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyTasksOperation {
    pub tasks: Vec<TaskDefinition>,
}

impl ApplyTasksOperation {
    pub fn new(tasks: Vec<TaskDefinition>) -> Result<Self, ConfigurationError> {
        if tasks.is_empty() {
            return Err(ConfigurationError::invalid(APPLY_TASKS, "at least one task is required"));
        }
        for task in &tasks {
            task.validate(APPLY_TASKS)?;
        }
        Ok(Self { tasks })
    }

    pub fn from_options(options: &OptionMap, _context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: TasksOptions = decode_options(APPLY_TASKS, options)?;
        Ok(Box::new(Self::new(raw.tasks)?))
    }

    async fn run_task(
        &self,
        ctx: &CancellationToken,
        env: &Environment,
        renderer: &TemplateRenderer,
        task: &TaskDefinition,
        repository: &RepositoryState,
    ) -> anyhow::Result<()> {
        let path = repository.path.display();
        let failure = |e: crate::tasks::TaskError| {
            anyhow::Error::new(e).context(format!("task {} in {}", task.name, repository.path.display()))
        };

        let plan = match TaskPlanner::new(task, renderer).build_plan(env, repository).await {
            Ok(plan) => plan,
            Err(e) => return handle_repository_failure(env, "TASK-FAILED", failure(e)),
        };
        for line in plan.describe() {
            env.output.line(line);
        }
        if env.dry_run {
            return Ok(());
        }

        match TaskExecutor::new(env, &plan).execute(ctx).await {
            Ok(TaskOutcome::Skipped { reason }) => {
                env.output.line(format!("TASK-SKIP: {} {path}: {reason}", task.name));
            }
            Ok(TaskOutcome::BranchExists { branch }) => {
                env.output
                    .line(format!("TASK-NOOP: {} {path}: branch {branch} already exists", task.name));
            }
            Ok(TaskOutcome::Applied {
                branch,
                files,
                pull_request,
            }) => {
                let mut line = format!("TASK-APPLIED: {} {path} branch={branch} files={files}", task.name);
                if let Some(number) = pull_request {
                    line.push_str(&format!(" pull_request=#{number}"));
                }
                env.output.line(line);
            }
            Err(e) => handle_repository_failure(env, "TASK-FAILED", failure(e))?,
        }
        Ok(())
    }
}

#[async_trait]
impl Operation for ApplyTasksOperation {
    fn name(&self) -> &'static str {
        APPLY_TASKS
    }

    async fn execute(&self, ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        let renderer = TemplateRenderer::new();
        for repository in &state.repositories {
            for task in &self.tasks {
                self.run_task(ctx, env, &renderer, task, repository).await?;
            }
        }
        Ok(())
    }
}
