//! Release bump command

use clap::Args;
use tracing::info;

use lockstep_core::types::BumpType;
use lockstep_core::workflow::create_release_bump;

use crate::cli::workspace::{finish, Workspace};
use crate::cli::{output, Cli, OutputFormat};

use super::bump::change_text;

/// Start a new release cycle from a main branch
#[derive(Debug, Args)]
pub struct ReleaseBumpCommand {
    /// Release group kind or package name
    pub target: String,

    /// Bump applied to the main branch (major or minor)
    #[arg(long, default_value = "minor")]
    pub bump: BumpType,
}

impl ReleaseBumpCommand {
    /// Execute the release-bump command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, bump = %self.bump, "executing release-bump command");
        let workspace = Workspace::load()?;
        let identity = workspace.repo.resolve_target(&self.target)?;
        let mut rc = workspace.into_release_context().await?;

        let result = create_release_bump(&mut rc, &identity, self.bump).await;
        let result = finish(&mut rc, cli, result).await?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "branch": result.branch,
                "release_branch": result.release_branch,
                "changes": result.changes,
                "instructions": result.instructions,
            }))?,
            OutputFormat::Text => {
                if cli.quiet {
                    println!("{}", result.branch);
                    return Ok(());
                }
                output::success(&format!("Created bump branch {}", result.branch));
                println!("{}", output::key_value("Release branch", &result.release_branch));
                for change in &result.changes {
                    println!("{}", output::key_value(&change.name, &change_text(change)));
                }
                println!();
                println!("{}", result.instructions);
            }
        }
        Ok(())
    }
}
