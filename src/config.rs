use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "repoflow.toml";
pub const RC_FILE: &str = ".repoflow-rc";
pub const ENV_PREFIX: &str = "REPOFLOW";

/// Application settings for repoflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepoflowConfig {
    pub logging: LoggingConfig,
    pub git: GitConfig,
    pub github: GitHubConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// git executable
    pub binary: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub CLI executable
    pub binary: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            binary: "gh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Skip confirmation prompts unless `--yes` is given explicitly
    pub assume_yes: bool,
}

impl RepoflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (repoflow.toml, .repoflow-rc) in the working directory
    /// 3. Environment variables (REPOFLOW_SECTION__KEY)
    pub fn load() -> Result<Self> {
        let directory = std::env::current_dir().context("resolving working directory")?;
        Self::load_from(&directory, None)
    }

    /// Load from `directory`; `environment` replaces the process environment when given
    pub fn load_from(directory: &Path, environment: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let toml_file = directory.join(CONFIG_FILE);
        if toml_file.exists() {
            builder = builder.add_source(File::from(toml_file).format(FileFormat::Toml));
        }

        let rc_file = directory.join(RC_FILE);
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(environment),
        );

        let config = builder.build().context("building configuration")?;
        config
            .try_deserialize()
            .context("invalid repoflow configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
