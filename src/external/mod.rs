//! External tool abstractions
//!
//! This module provides trait-based abstractions for external CLI tools like GitHub CLI
//! and Git, enabling testable code through dependency injection and mock implementations.

pub mod command;
pub mod git;
pub mod github;

pub use command::{CommandDetails, CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::{GitExecutor, GitRepositoryManager, RepositoryManager, ShellGitExecutor};
pub use github::{
    GhCliClient, GitHubClient, GitHubError, NewPullRequest, PagesConfiguration, PagesStatus, PullRequest,
    PullRequestListOptions, RepositoryMetadata,
};
