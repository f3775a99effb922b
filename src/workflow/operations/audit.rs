use super::{Operation, AUDIT_REPORT};
use crate::audit::{write_audit_report, RepositoryInspection};
use crate::fs::DEFAULT_FILE_PERMISSIONS;
use crate::workflow::config::OptionMap;
use crate::workflow::errors::ConfigurationError;
use crate::workflow::registry::{decode_options, BuildContext};
use crate::workflow::state::{Environment, State};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuditOptions {
    #[serde(default)]
    output: Option<String>,
}

/// Writes the CSV audit of every repository in the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReportOperation {
    /// Report file; stdout when unset
    pub output: Option<PathBuf>,
}

impl AuditReportOperation {
    pub fn from_options(options: &OptionMap, context: &BuildContext) -> Result<Box<dyn Operation>, ConfigurationError> {
        let raw: AuditOptions = decode_options(AUDIT_REPORT, options)?;
        Ok(Box::new(Self {
            output: raw.output.as_deref().and_then(|o| context.sanitizer.sanitize(o)),
        }))
    }
}

#[async_trait]
impl Operation for AuditReportOperation {
    fn name(&self) -> &'static str {
        AUDIT_REPORT
    }

    async fn execute(&self, _ctx: &CancellationToken, env: &Environment, state: &mut State) -> anyhow::Result<()> {
        let inspections: Vec<RepositoryInspection> =
            state.repositories.iter().map(|r| r.inspection.clone()).collect();

        let Some(path) = &self.output else {
            return env
                .output
                .with_writer(|writer| write_audit_report(writer, &inspections))
                .context("writing audit report");
        };

        if env.dry_run {
            env.output.line(format!(
                "PLAN-AUDIT-REPORT: {} ({} repositories)",
                path.display(),
                inspections.len()
            ));
            return Ok(());
        }

        let mut report = Vec::new();
        write_audit_report(&mut report, &inspections).context("rendering audit report")?;
        env.file_system
            .write_file(path, &report, DEFAULT_FILE_PERMISSIONS)
            .await
            .with_context(|| format!("writing audit report to {}", path.display()))?;
        tracing::info!(path = %path.display(), repositories = inspections.len(), "audit report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AUDIT_REPORT_HEADER;
    use crate::fs::MockFileSystem;
    use crate::testing::{sample_inspection, TestHarness};
    use crate::workflow::sanitize::PathSanitizer;
    use crate::workflow::state::RepositoryState;
    use std::sync::Arc;

    fn state() -> State {
        State {
            roots: vec![PathBuf::from("/work")],
            repositories: vec![
                RepositoryState::new(sample_inspection("/work/demo", "octo/demo")),
                RepositoryState::new(sample_inspection("/work/legacy", "octo/tools")),
            ],
        }
    }

    #[test]
    fn test_output_path_is_sanitized() {
        let mut options = OptionMap::new();
        options.insert("output".to_string(), "reports/../audit.csv".into());
        let context = BuildContext {
            sanitizer: PathSanitizer::new(PathBuf::from("/work"), None),
        };
        let operation = AuditReportOperation::from_options(&options, &context).unwrap();
        assert!(format!("{operation:?}").contains("/work/audit.csv"));
    }

    #[tokio::test]
    async fn test_report_goes_to_output_without_path() {
        let harness = TestHarness::new();
        let env = harness.environment(false);

        AuditReportOperation::default()
            .execute(&CancellationToken::new(), &env, &mut state())
            .await
            .unwrap();

        let output = harness.output();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], AUDIT_REPORT_HEADER);
        assert!(lines[1].starts_with("octo/demo,demo,yes,"));
        assert!(lines[2].starts_with("octo/tools,legacy,no,"));
    }

    #[tokio::test]
    async fn test_report_written_through_file_system() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_write_file()
            .withf(|path, contents, permissions| {
                path == std::path::Path::new("/work/audit.csv")
                    && String::from_utf8_lossy(contents).starts_with(AUDIT_REPORT_HEADER)
                    && *permissions == 0o644
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut harness = TestHarness::new();
        harness.file_system = Arc::new(file_system);
        let env = harness.environment(false);

        let operation = AuditReportOperation {
            output: Some(PathBuf::from("/work/audit.csv")),
        };
        operation.execute(&CancellationToken::new(), &env, &mut state()).await.unwrap();
        assert!(harness.output().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write_report_file() {
        let mut file_system = MockFileSystem::new();
        file_system.expect_write_file().never();
        let mut harness = TestHarness::new();
        harness.file_system = Arc::new(file_system);
        let env = harness.environment(true);

        let operation = AuditReportOperation {
            output: Some(PathBuf::from("/work/audit.csv")),
        };
        operation.execute(&CancellationToken::new(), &env, &mut state()).await.unwrap();
        assert_eq!(harness.output(), "PLAN-AUDIT-REPORT: /work/audit.csv (2 repositories)\n");
    }
}
