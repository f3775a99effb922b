use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "repoflow")]
#[command(version)]
#[command(about = "Declarative maintenance workflows across many Git/GitHub repositories")]
#[command(long_about = "repoflow discovers git repositories under the given roots and applies \
                       workflow steps to each of them: remote normalization, directory renames, \
                       default-branch migration, templated tasks, audits and release tags.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow configuration over every repository under the roots
    Workflow {
        /// Workflow configuration file (YAML, or JSON with a .json extension)
        config: PathBuf,
        /// Directories to search for repositories (default: current directory)
        roots: Vec<String>,
        /// Print the plan without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Migrate the default branch of every repository under the roots
    Migrate {
        roots: Vec<String>,
        /// Branch to migrate away from
        #[arg(long, default_value = crate::migrate::DEFAULT_SOURCE_BRANCH)]
        from: String,
        /// Branch to migrate to
        #[arg(long, default_value = crate::migrate::DEFAULT_TARGET_BRANCH)]
        to: String,
        /// Remote the rewritten workflows are pushed to
        #[arg(long, default_value = crate::migrate::DEFAULT_REMOTE)]
        remote: String,
        /// Directory holding CI workflow files
        #[arg(long, default_value = crate::migrate::DEFAULT_WORKFLOWS_DIRECTORY)]
        workflows_dir: String,
        /// Commit workflow rewrites without pushing them
        #[arg(long)]
        no_push: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Write a CSV audit of every repository under the roots
    Audit {
        roots: Vec<String>,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Inspect application settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
}
