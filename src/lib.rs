// repoflow library - declarative maintenance workflows across Git/GitHub repositories
// This exposes the engine, its collaborators and the CLI commands for integration tests

pub mod audit;
pub mod cli;
pub mod config;
pub mod external;
pub mod fs;
pub mod migrate;
pub mod prompt;
pub mod repos;
pub mod tasks;
pub mod telemetry;
pub mod workflow;

#[cfg(test)]
pub mod testing;

// Re-export key types for easy access
pub use audit::{GitInspector, InspectionDepth, RepositoryInspection, RepositoryInspector};
pub use config::RepoflowConfig;
pub use migrate::{MigrationError, MigrationOptions, MigrationResult, MigrationService, SafetyStatus};
pub use tasks::{TaskDefinition, TaskError, TaskPlan, TaskPlanner};
pub use telemetry::init_telemetry;
pub use workflow::{
    build_operations, load_configuration, ConfigurationError, Dependencies, Executor, Operation, OperationRegistry,
    RuntimeOptions, WorkflowError,
};
