use crate::fs::DEFAULT_FILE_PERMISSIONS;
use crate::workflow::errors::ConfigurationError;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PUSH_REMOTE: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    pub name: String,
    #[serde(default)]
    pub ensure_clean: bool,
    pub branch: TaskBranchDefinition,
    #[serde(default)]
    pub files: Vec<TaskFileDefinition>,
    pub commit: TaskCommitDefinition,
    #[serde(default)]
    pub pull_request: Option<TaskPullRequestDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskBranchDefinition {
    pub name_template: String,
    #[serde(default = "default_push_remote")]
    pub push_remote: String,
}

fn default_push_remote() -> String {
    DEFAULT_PUSH_REMOTE.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileMode {
    #[default]
    Overwrite,
    SkipIfExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFileDefinition {
    /// Template for the path relative to the repository root
    pub path: String,
    /// Template for the file body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mode: FileMode,
    #[serde(default, deserialize_with = "deserialize_permissions")]
    pub permissions: Option<u32>,
}

impl TaskFileDefinition {
    pub fn effective_permissions(&self) -> u32 {
        self.permissions.unwrap_or(DEFAULT_FILE_PERMISSIONS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCommitDefinition {
    pub message_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPullRequestDefinition {
    pub title_template: String,
    #[serde(default)]
    pub body_template: String,
    /// Base branch; defaults to the plan's start point
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

impl TaskDefinition {
    pub fn validate(&self, operation: &str) -> Result<(), ConfigurationError> {
        let invalid = |message: String| ConfigurationError::invalid(operation, message);
        if self.name.trim().is_empty() {
            return Err(invalid("task name is required".to_string()));
        }
        if self.branch.name_template.trim().is_empty() {
            return Err(invalid(format!("task {}: branch.name_template is required", self.name)));
        }
        if self.branch.push_remote.trim().is_empty() {
            return Err(invalid(format!("task {}: branch.push_remote must not be empty", self.name)));
        }
        if self.commit.message_template.trim().is_empty() {
            return Err(invalid(format!("task {}: commit.message_template is required", self.name)));
        }
        if self.files.is_empty() {
            return Err(invalid(format!("task {}: at least one file is required", self.name)));
        }
        if let Some(index) = self.files.iter().position(|f| f.path.trim().is_empty()) {
            return Err(invalid(format!("task {}: file {index} has an empty path", self.name)));
        }
        if let Some(pr) = &self.pull_request {
            if pr.title_template.trim().is_empty() {
                return Err(invalid(format!("task {}: pull_request.title_template is required", self.name)));
            }
        }
        Ok(())
    }
}

/// `"0755"`, `"755"` and `755` all mean octal 0o755
pub fn parse_permissions(value: &str) -> Result<u32, String> {
    let digits = value.trim();
    let digits = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
        .unwrap_or(digits);
    if digits.is_empty() {
        return Err("permissions must not be empty".to_string());
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("invalid octal permissions '{value}'"))?;
    if mode > 0o7777 {
        return Err(format!("permissions '{value}' out of range"));
    }
    Ok(mode)
}

fn deserialize_permissions<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPermissions {
        Number(u64),
        Text(String),
    }

    match Option::<RawPermissions>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPermissions::Number(n)) => parse_permissions(&n.to_string())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(RawPermissions::Text(s)) => parse_permissions(&s).map(Some).map_err(serde::de::Error::custom),
    }
}
