//! Template rendering for task definitions
//!
//! Templates are written with Go-style field access (`{{ .Repository.Name }}`).
//! The leading dots are stripped inside `{{ }}` before handing the text to
//! minijinja, so `{{ Repository.Name }}` works as well.

use super::TaskError;
use crate::audit::RepositoryInspection;
use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryTemplateData {
    pub path: String,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub folder_name: String,
    pub default_branch: String,
    pub local_branch: String,
    #[serde(rename = "OriginURL")]
    pub origin_url: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskTemplateData {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateData {
    pub repository: RepositoryTemplateData,
    pub task: TaskTemplateData,
}

impl TemplateData {
    pub fn new(inspection: &RepositoryInspection, task_name: &str) -> Self {
        let full_name = inspection.final_github_repo().to_string();
        let owner = full_name
            .split_once('/')
            .map(|(owner, _)| owner.to_string())
            .unwrap_or_default();
        Self {
            repository: RepositoryTemplateData {
                path: inspection.path.display().to_string(),
                name: inspection.repository_name(),
                full_name,
                owner,
                folder_name: inspection.folder_name.clone(),
                default_branch: inspection.remote_default_branch.clone(),
                local_branch: inspection.local_branch.clone(),
                origin_url: inspection.origin_url.clone(),
                protocol: inspection.remote_protocol.to_string(),
            },
            task: TaskTemplateData {
                name: task_name.to_string(),
            },
        }
    }
}

pub struct TemplateRenderer {
    environment: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);
        environment.set_keep_trailing_newline(true);
        Self { environment }
    }

    /// Render `template`; `field` names the definition field in errors
    pub fn render(&self, field: &str, template: &str, data: &TemplateData) -> Result<String, TaskError> {
        let source = normalize_go_template(template);
        self.environment
            .render_str(&source, data)
            .map_err(|e| TaskError::Template {
                field: field.to_string(),
                message: e.to_string(),
            })
    }
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid expression regex"))
}

fn field_access_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(^|[\s(,|])\.([A-Za-z_])").expect("valid field regex"))
}

/// Strip Go's leading dot from field references inside `{{ }}`
pub fn normalize_go_template(template: &str) -> String {
    expression_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            let inner = field_access_pattern().replace_all(&caps[1], "$1$2");
            format!("{{{{{inner}}}}}")
        })
        .into_owned()
}

fn slug_separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid slug regex"))
}

/// Collapse every non-alphanumeric run to one hyphen and trim hyphens
pub fn slugify_branch(name: &str) -> String {
    slug_separator_pattern()
        .replace_all(name.trim(), "-")
        .trim_matches('-')
        .to_string()
}
