use anyhow::Result;
use clap::Parser;
use repoflow::cli::commands::audit::AuditCommand;
use repoflow::cli::commands::config::ConfigShowCommand;
use repoflow::cli::commands::migrate::MigrateCommand;
use repoflow::cli::commands::workflow::WorkflowCommand;
use repoflow::cli::commands::Command;
use repoflow::cli::{Cli, Commands, ConfigAction};
use repoflow::config::RepoflowConfig;
use repoflow::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    RepoflowConfig::load_env_file()?;
    let settings = RepoflowConfig::load()?;
    init_telemetry(&settings.logging)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Workflow {
            config,
            roots,
            dry_run,
            yes,
        } => runtime.block_on(async {
            WorkflowCommand::new(settings, config, roots)
                .with_dry_run(dry_run)
                .with_yes(yes)
                .execute()
                .await
        }),
        Commands::Migrate {
            roots,
            from,
            to,
            remote,
            workflows_dir,
            no_push,
            dry_run,
            yes,
        } => runtime.block_on(async {
            MigrateCommand::new(settings, roots)
                .with_branches(from, to)
                .with_remote(remote, workflows_dir, !no_push)
                .with_dry_run(dry_run)
                .with_yes(yes)
                .execute()
                .await
        }),
        Commands::Audit { roots, output } => {
            runtime.block_on(async { AuditCommand::new(settings, roots, output).execute().await })
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => runtime.block_on(async { ConfigShowCommand::new(settings).execute().await }),
    }
}
