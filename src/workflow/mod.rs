//! Workflow orchestration engine
//!
//! A workflow document lists reusable `tools` and ordered `steps`. Steps are
//! compiled into `Operation`s through the `OperationRegistry`, then the
//! `Executor` discovers repositories under the requested roots and runs each
//! operation over them in order.

pub mod config;
pub mod errors;
pub mod executor;
pub mod operations;
pub mod outcome;
pub mod registry;
pub mod sanitize;
pub mod state;

pub use config::{load_configuration, parse_configuration, Configuration, OptionMap, StepConfiguration, ToolConfiguration};
pub use errors::{ConfigurationError, WorkflowError};
pub use executor::{Dependencies, Executor};
pub use operations::Operation;
pub use outcome::{classify, handle_repository_failure, Classify, FailureClass};
pub use registry::{build_operations, BuildContext, OperationRegistry};
pub use sanitize::PathSanitizer;
pub use state::{Environment, OutputSink, RepositoryState, RuntimeOptions, SharedBuffer, State};
