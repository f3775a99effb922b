//! Workflow document model and loader

use super::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Raw `with:` options of a tool or step
pub type OptionMap = BTreeMap<String, serde_yaml::Value>;

pub const TOOL_REFERENCE_KEY: &str = "tool_ref";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub tools: Vec<ToolConfiguration>,
    #[serde(default)]
    pub steps: Vec<StepConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfiguration {
    pub name: String,
    #[serde(default)]
    pub operation: String,
    #[serde(rename = "with", default)]
    pub options: OptionMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConfiguration {
    #[serde(default)]
    pub operation: String,
    #[serde(rename = "with", default)]
    pub options: OptionMap,
}

impl StepConfiguration {
    /// Name of the referenced tool, if any
    pub fn tool_reference(&self) -> Option<String> {
        match self.options.get(TOOL_REFERENCE_KEY) {
            Some(serde_yaml::Value::String(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            _ => None,
        }
    }
}

impl Configuration {
    pub fn tool(&self, name: &str) -> Option<&ToolConfiguration> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(ConfigurationError::DuplicateTool {
                    name: tool.name.clone(),
                });
            }
            if tool.operation.trim().is_empty() {
                return Err(ConfigurationError::EmptyToolOperation {
                    name: tool.name.clone(),
                });
            }
        }

        if self.steps.is_empty() {
            return Err(ConfigurationError::EmptySteps);
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.operation.trim().is_empty() && step.tool_reference().is_none() {
                return Err(ConfigurationError::MissingOperation { index });
            }
        }
        Ok(())
    }
}

/// Parse a workflow document; JSON goes through serde_json when `is_json`
pub fn parse_configuration(text: &str, is_json: bool) -> Result<Configuration, ConfigurationError> {
    let configuration: Configuration = if is_json {
        serde_json::from_str(text).map_err(|e| ConfigurationError::Parse { message: e.to_string() })?
    } else {
        serde_yaml::from_str(text).map_err(|e| ConfigurationError::Parse { message: e.to_string() })?
    };
    configuration.validate()?;
    Ok(configuration)
}

pub fn load_configuration(path: &Path) -> Result<Configuration, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    parse_configuration(&text, is_json)
}
