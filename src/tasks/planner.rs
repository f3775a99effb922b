use super::definition::{FileMode, TaskDefinition};
use super::template::{slugify_branch, TemplateData, TemplateRenderer};
use super::{TaskError, SKIP_REASON_EXISTS, SKIP_REASON_NO_CHANGES, SKIP_REASON_UNCHANGED};
use crate::workflow::state::{Environment, RepositoryState};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Rendered path relative to the repository root
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub content: String,
    pub permissions: u32,
    pub existed: bool,
    pub apply: bool,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPullRequest {
    pub repository: String,
    pub title: String,
    pub body: String,
    pub base: String,
    pub draft: bool,
}

/// Rendered, per-repository plan for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
    pub task_name: String,
    pub repository_path: PathBuf,
    pub ensure_clean: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub branch_name: String,
    pub start_point: String,
    pub push_remote: String,
    pub commit_message: String,
    pub file_changes: Vec<FileChange>,
    pub pull_request: Option<PlannedPullRequest>,
}

impl TaskPlan {
    pub fn changed_files(&self) -> impl Iterator<Item = &FileChange> {
        self.file_changes.iter().filter(|c| c.apply)
    }

    /// Human-readable preview, one line per fact
    pub fn describe(&self) -> Vec<String> {
        let path = self.repository_path.display();
        let mut lines = Vec::new();
        if self.skipped {
            lines.push(format!(
                "TASK-PLAN: {} {path} skipped ({})",
                self.task_name,
                self.skip_reason.as_deref().unwrap_or_default()
            ));
            return lines;
        }
        lines.push(format!(
            "TASK-PLAN: {} {path} branch={} start={} remote={}",
            self.task_name, self.branch_name, self.start_point, self.push_remote
        ));
        for change in &self.file_changes {
            match (change.apply, &change.skip_reason) {
                (true, _) => lines.push(format!(
                    "TASK-PLAN: {} {path} {} {}",
                    self.task_name,
                    if change.existed { "update" } else { "create" },
                    change.relative_path
                )),
                (false, reason) => lines.push(format!(
                    "TASK-PLAN: {} {path} skip {} ({})",
                    self.task_name,
                    change.relative_path,
                    reason.as_deref().unwrap_or_default()
                )),
            }
        }
        lines.push(format!("TASK-PLAN: {} {path} commit \"{}\"", self.task_name, self.commit_message));
        if let Some(pr) = &self.pull_request {
            lines.push(format!(
                "TASK-PLAN: {} {path} pull request \"{}\" into {}",
                self.task_name, pr.title, pr.base
            ));
        }
        lines
    }
}

pub struct TaskPlanner<'a> {
    definition: &'a TaskDefinition,
    renderer: &'a TemplateRenderer,
}

impl<'a> TaskPlanner<'a> {
    pub fn new(definition: &'a TaskDefinition, renderer: &'a TemplateRenderer) -> Self {
        Self { definition, renderer }
    }

    pub async fn build_plan(&self, env: &Environment, repository: &RepositoryState) -> Result<TaskPlan, TaskError> {
        let definition = self.definition;
        let inspection = &repository.inspection;
        let data = TemplateData::new(inspection, &definition.name);

        let start_point = [&inspection.remote_default_branch, &inspection.local_branch]
            .into_iter()
            .map(|b| b.trim())
            .find(|b| !b.is_empty())
            .ok_or_else(|| TaskError::MissingStartPoint {
                path: repository.path.clone(),
            })?
            .to_string();

        let rendered_branch = self.renderer.render("branch.name_template", &definition.branch.name_template, &data)?;
        let branch_name = slugify_branch(&rendered_branch);
        if branch_name.is_empty() {
            return Err(TaskError::Template {
                field: "branch.name_template".to_string(),
                message: format!("'{rendered_branch}' produces an empty branch name"),
            });
        }
        let commit_message = self
            .renderer
            .render("commit.message_template", &definition.commit.message_template, &data)?
            .trim()
            .to_string();

        let mut file_changes = Vec::with_capacity(definition.files.len());
        for file in &definition.files {
            let relative_path = self.renderer.render("files.path", &file.path, &data)?.trim().to_string();
            let absolute_path = repository.path.join(validate_relative_path(&relative_path)?);
            let content = self.renderer.render("files.content", &file.content, &data)?;

            let existing = match env.file_system.read_file(&absolute_path).await {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(source) => {
                    return Err(TaskError::Io {
                        context: format!("reading {}", absolute_path.display()),
                        source,
                    })
                }
            };

            let skip_reason = match (&existing, file.mode) {
                (Some(_), FileMode::SkipIfExists) => Some(SKIP_REASON_EXISTS),
                (Some(bytes), FileMode::Overwrite) if bytes.as_slice() == content.as_bytes() => {
                    Some(SKIP_REASON_UNCHANGED)
                }
                _ => None,
            };
            file_changes.push(FileChange {
                relative_path,
                absolute_path,
                content,
                permissions: file.effective_permissions(),
                existed: existing.is_some(),
                apply: skip_reason.is_none(),
                skip_reason: skip_reason.map(str::to_string),
            });
        }

        let pull_request = match &definition.pull_request {
            Some(pr) => Some(PlannedPullRequest {
                repository: inspection.final_github_repo().to_string(),
                title: self.renderer.render("pull_request.title_template", &pr.title_template, &data)?.trim().to_string(),
                body: self.renderer.render("pull_request.body_template", &pr.body_template, &data)?,
                base: pr.base.clone().filter(|b| !b.trim().is_empty()).unwrap_or_else(|| start_point.clone()),
                draft: pr.draft,
            }),
            None => None,
        };

        let skipped = !file_changes.iter().any(|c| c.apply);
        Ok(TaskPlan {
            task_name: definition.name.clone(),
            repository_path: repository.path.clone(),
            ensure_clean: definition.ensure_clean,
            skipped,
            skip_reason: skipped.then(|| SKIP_REASON_NO_CHANGES.to_string()),
            branch_name,
            start_point,
            push_remote: definition.branch.push_remote.clone(),
            commit_message,
            file_changes,
            pull_request,
        })
    }
}

/// Rendered paths must stay inside the repository
fn validate_relative_path(rendered: &str) -> Result<&Path, TaskError> {
    let invalid = |reason| TaskError::InvalidPath {
        path: rendered.to_string(),
        reason,
    };
    if rendered.is_empty() {
        return Err(invalid("path is empty"));
    }
    let path = Path::new(rendered);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path escapes the repository")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("path must be relative")),
        }
    }
    Ok(path)
}
