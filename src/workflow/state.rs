//! Shared run state handed to every workflow operation

use crate::audit::{InspectionDepth, RepositoryInspection, RepositoryInspector};
use crate::external::{GitExecutor, GitHubClient, RepositoryManager};
use crate::fs::FileSystem;
use crate::prompt::{ConfirmationPrompter, PromptState};
use anyhow::{anyhow, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub dry_run: bool,
    pub assume_yes: bool,
}

/// Line-oriented sink for progress output or warnings
#[derive(Clone)]
pub struct OutputSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

/// In-memory capture of an `OutputSink`
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedBufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("output buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl OutputSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = Self::new(Box::new(SharedBufferWriter(buffer.bytes.clone())));
        (sink, buffer)
    }

    pub fn line(&self, text: impl AsRef<str>) {
        let result = self.with_writer(|writer| writeln!(writer, "{}", text.as_ref()));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write output line");
        }
    }

    pub fn with_writer<T>(
        &self,
        f: impl FnOnce(&mut dyn Write) -> std::io::Result<T>,
    ) -> std::io::Result<T> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("output sink poisoned"))?;
        f(writer.as_mut())
    }
}

/// Collaborators and run-wide flags. One instance per run, passed by reference.
pub struct Environment {
    pub git_executor: Arc<dyn GitExecutor>,
    pub repository_manager: Arc<dyn RepositoryManager>,
    pub github_client: Arc<dyn GitHubClient>,
    pub file_system: Arc<dyn FileSystem>,
    pub inspector: Arc<dyn RepositoryInspector>,
    pub prompter: Arc<dyn ConfirmationPrompter>,
    pub prompt_state: PromptState,
    pub output: OutputSink,
    pub errors: OutputSink,
    pub dry_run: bool,
}

impl Environment {
    /// Print a warning line and mirror it to the log
    pub fn warn(&self, text: impl AsRef<str>) {
        tracing::warn!("{}", text.as_ref());
        self.errors.line(text);
    }

    /// Ask for confirmation unless assume-yes is active
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompt_state.confirm(self.prompter.as_ref(), prompt)
    }
}

/// Live handle on one discovered repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    pub path: PathBuf,
    pub inspection: RepositoryInspection,
}

impl RepositoryState {
    pub fn new(inspection: RepositoryInspection) -> Self {
        Self {
            path: inspection.path.clone(),
            inspection,
        }
    }

    /// Re-inspect the repository at its current path
    pub async fn refresh(&mut self, ctx: &CancellationToken, env: &Environment) -> Result<()> {
        let inspections = env
            .inspector
            .inspect(ctx, std::slice::from_ref(&self.path), InspectionDepth::Full)
            .await?;
        let mut inspection = inspections
            .iter()
            .find(|i| i.path == self.path)
            .or_else(|| inspections.first())
            .cloned()
            .ok_or_else(|| anyhow!("repository {} not found during refresh", self.path.display()))?;
        inspection.path = self.path.clone();
        self.inspection = inspection;
        Ok(())
    }
}

/// Roots plus repositories for one engine run, in discovery order
#[derive(Debug, Clone, Default)]
pub struct State {
    pub roots: Vec<PathBuf>,
    pub repositories: Vec<RepositoryState>,
}
