//! Release command

use clap::Args;
use tracing::info;

use lockstep_core::types::BumpType;
use lockstep_core::workflow::{push_publish_tags, release_version, ReleaseOutcome};

use crate::cli::workspace::{finish, Workspace};
use crate::cli::{output, Cli, OutputFormat};

use super::bump::change_text;

/// Run the release handshake on a release branch.
///
/// The first run lists the tags that still need publishing. Once they exist
/// the next run moves the released versions to their next patch.
#[derive(Debug, Args)]
pub struct ReleaseCommand {
    /// Release group kind or package name
    pub target: String,

    /// Bump applied after release (only patch is supported)
    #[arg(long, default_value = "patch")]
    pub bump: BumpType,

    /// Create and push the missing publish tags to start the publish builds
    #[arg(long)]
    pub push_tags: bool,
}

impl ReleaseCommand {
    /// Execute the release command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, bump = %self.bump, "executing release command");
        let workspace = Workspace::load()?;
        let identity = workspace.repo.resolve_target(&self.target)?;
        let mut rc = workspace.into_release_context().await?;

        let result = release_version(&mut rc, &identity, self.bump).await;
        let outcome = finish(&mut rc, cli, result).await?;

        let mut pushed = Vec::new();
        if let ReleaseOutcome::AwaitingPublish(pending) = &outcome {
            if self.push_tags {
                let result = push_publish_tags(&mut rc, pending).await;
                pushed = finish(&mut rc, cli, result).await?;
            }
        }

        match cli.format {
            OutputFormat::Json => {
                let mut value = outcome_json(&outcome);
                value["pushed_tags"] = serde_json::json!(pushed);
                output::json(&value)
            }
            OutputFormat::Text => {
                print_outcome(&outcome, cli.quiet);
                if !cli.quiet {
                    for tag in &pushed {
                        output::success(&format!(
                            "Pushed {}",
                            output::tag_style().apply_to(tag)
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

fn outcome_json(outcome: &ReleaseOutcome) -> serde_json::Value {
    match outcome {
        ReleaseOutcome::AwaitingPublish(pending) => serde_json::json!({
            "status": "awaiting_publish",
            "pending": pending
                .iter()
                .map(|p| serde_json::json!({
                    "name": p.identity.to_string(),
                    "version": p.version,
                    "tag": p.tag,
                }))
                .collect::<Vec<_>>(),
        }),
        ReleaseOutcome::Released {
            branch,
            released,
            changes,
        } => serde_json::json!({
            "status": "released",
            "branch": branch,
            "released": released
                .iter()
                .map(|(identity, version)| serde_json::json!({
                    "name": identity.to_string(),
                    "version": version,
                }))
                .collect::<Vec<_>>(),
            "changes": changes,
        }),
    }
}

fn print_outcome(outcome: &ReleaseOutcome, quiet: bool) {
    match outcome {
        ReleaseOutcome::AwaitingPublish(pending) => {
            if quiet {
                for p in pending {
                    println!("{}", p.tag);
                }
                return;
            }
            output::warning("Not released yet. These versions are waiting to be published:");
            for p in pending {
                println!(
                    "  {}  {}",
                    output::tag_style().apply_to(&p.tag),
                    output::version_style().apply_to(&p.version)
                );
            }
            output::info("Pushing a publish tag starts its build (see --push-tags). Run release again once the packages are published");
        }
        ReleaseOutcome::Released {
            branch,
            released,
            changes,
        } => {
            if quiet {
                println!("{}", branch);
                return;
            }
            println!("{}", output::header("Released"));
            for (identity, version) in released {
                println!(
                    "{}",
                    output::key_value(
                        &identity.to_string(),
                        &output::version_style().apply_to(version).to_string()
                    )
                );
            }
            println!();
            println!("{}", output::header("Next patch versions"));
            for change in changes {
                println!("{}", output::key_value(&change.name, &change_text(change)));
            }
            println!();
            output::success(&format!("Bump committed on branch {}", branch));
            output::info("Push the branch and open a pull request into the release branch");
        }
    }
}
