//! Bump command

use clap::Args;
use tracing::info;

use lockstep_core::types::BumpRequest;
use lockstep_core::workflow::{bump_version, BumpOptions, BumpResult};

use crate::cli::workspace::{finish, Workspace};
use crate::cli::{output, Cli, OutputFormat};

/// Bump the version of a release group or package
#[derive(Debug, Args)]
pub struct BumpCommand {
    /// Release group kind or package name
    pub target: String,

    /// major, minor, patch, current, or an exact version
    pub bump: BumpRequest,

    /// Skip installing dependencies before bumping
    #[arg(long)]
    pub no_install: bool,

    /// Leave the changes uncommitted
    #[arg(long)]
    pub no_commit: bool,
}

impl BumpCommand {
    /// Execute the bump command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, bump = %self.bump, "executing bump command");
        let workspace = Workspace::load()?;
        let identity = workspace.repo.resolve_target(&self.target)?;
        let mut rc = workspace.into_release_context().await?;

        let options = BumpOptions {
            install: !self.no_install,
            commit: !self.no_commit,
        };
        let result = bump_version(&mut rc, &identity, &self.bump, &options).await;
        let result = finish(&mut rc, cli, result).await?;

        self.output_result(&result, cli)
    }

    fn output_result(&self, result: &BumpResult, cli: &Cli) -> anyhow::Result<()> {
        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "target": result.identity.to_string(),
                "version": result.version,
                "committed": !self.no_commit && !result.changes.is_empty(),
                "changes": result.changes,
            })),
            OutputFormat::Text => {
                if cli.quiet {
                    println!("{}", result.version);
                    return Ok(());
                }
                if result.changes.is_empty() {
                    output::warning(&format!(
                        "{} is already at {}",
                        result.identity, result.version
                    ));
                    return Ok(());
                }
                output::success(&format!(
                    "Bumped {} to {}",
                    result.identity,
                    output::version_style().apply_to(&result.version)
                ));
                for change in &result.changes {
                    println!("{}", output::key_value(&change.name, &change_text(change)));
                }
                Ok(())
            }
        }
    }
}

/// `previous -> current` for display
pub(crate) fn change_text(change: &lockstep_core::types::VersionChange) -> String {
    match &change.previous {
        Some(previous) => format!(
            "{} -> {}",
            previous,
            output::version_style().apply_to(&change.current)
        ),
        None => format!("{} (new)", output::version_style().apply_to(&change.current)),
    }
}
