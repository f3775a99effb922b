//! Operation type registry and step compilation

use super::config::{Configuration, OptionMap, StepConfiguration, TOOL_REFERENCE_KEY};
use super::errors::ConfigurationError;
use super::operations::{
    self, ApplyTasksOperation, AuditReportOperation, CanonicalRemoteOperation, MigrateBranchOperation, Operation,
    ProtocolConversionOperation, ReleaseTagOperation, RenameDirectoriesOperation,
};
use super::sanitize::PathSanitizer;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Shared inputs available to operation factories
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub sanitizer: PathSanitizer,
}

pub type OperationFactory = fn(&OptionMap, &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError>;

#[derive(Default)]
pub struct OperationRegistry {
    factories: HashMap<String, OperationFactory>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(operations::CONVERT_PROTOCOL, ProtocolConversionOperation::from_options);
        registry.register(operations::UPDATE_CANONICAL_REMOTE, CanonicalRemoteOperation::from_options);
        registry.register(operations::RENAME_DIRECTORIES, RenameDirectoriesOperation::from_options);
        registry.register(operations::MIGRATE_BRANCH, MigrateBranchOperation::from_options);
        registry.register(operations::AUDIT_REPORT, AuditReportOperation::from_options);
        registry.register(operations::APPLY_TASKS, ApplyTasksOperation::from_options);
        registry.register(operations::RELEASE_TAG, ReleaseTagOperation::from_options);
        registry
    }

    pub fn register(&mut self, operation: &str, factory: OperationFactory) {
        self.factories.insert(operation.to_string(), factory);
    }

    pub fn build(
        &self,
        operation: &str,
        options: &OptionMap,
        context: &BuildContext,
    ) -> Result<Box<dyn Operation>, ConfigurationError> {
        let factory = self
            .factories
            .get(operation)
            .ok_or_else(|| ConfigurationError::UnsupportedOperation {
                operation: operation.to_string(),
            })?;
        factory(options, context)
    }
}

/// Resolve a step's operation type and merged options (step keys win over tool defaults)
pub fn resolve_step(
    configuration: &Configuration,
    step: &StepConfiguration,
) -> Result<(String, OptionMap), ConfigurationError> {
    let step_operation = step.operation.trim().to_string();
    let (operation, mut options) = match step.tool_reference() {
        Some(tool_name) => {
            let tool = configuration
                .tool(&tool_name)
                .ok_or_else(|| ConfigurationError::ToolReferenceNotFound {
                    tool_name: tool_name.clone(),
                })?;
            let tool_operation = tool.operation.trim().to_string();
            if !step_operation.is_empty() && step_operation != tool_operation {
                return Err(ConfigurationError::OperationMismatch {
                    step_operation,
                    tool_name,
                    tool_operation,
                });
            }
            let mut merged = tool.options.clone();
            merged.extend(step.options.clone());
            (tool_operation, merged)
        }
        None => (step_operation, step.options.clone()),
    };
    options.remove(TOOL_REFERENCE_KEY);
    Ok((operation, options))
}

/// Compile every step, in order
pub fn build_operations(
    configuration: &Configuration,
    registry: &OperationRegistry,
    context: &BuildContext,
) -> Result<Vec<Box<dyn Operation>>, ConfigurationError> {
    configuration
        .steps
        .iter()
        .map(|step| {
            let (operation, options) = resolve_step(configuration, step)?;
            registry.build(&operation, &options, context)
        })
        .collect()
}

/// Decode an option map into a typed options struct
pub fn decode_options<T: DeserializeOwned>(operation: &str, options: &OptionMap) -> Result<T, ConfigurationError> {
    let mapping: serde_yaml::Mapping = options
        .iter()
        .map(|(key, value)| (serde_yaml::Value::String(key.clone()), value.clone()))
        .collect();
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
        .map_err(|e| ConfigurationError::invalid(operation, e.to_string()))
}
