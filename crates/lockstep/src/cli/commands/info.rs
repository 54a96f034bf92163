//! Info command

use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use lockstep_core::bag::ReferenceVersionBag;
use lockstep_core::reconcile::{collect_version_info, ReconcileOptions};

use crate::cli::workspace::Workspace;
use crate::cli::{output, Cli, OutputFormat};

/// Show reconciled dependency versions for a release group or package
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// Release group kind or package name
    pub target: String,

    /// Only list identities that still track their local version
    #[arg(long)]
    pub need_bump: bool,
}

impl InfoCommand {
    /// Execute the info command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, "executing info command");
        let workspace = Workspace::load()?;
        let identity = workspace.repo.resolve_target(&self.target)?;
        let registry = Arc::new(workspace.registry()?);
        let options = ReconcileOptions::from_config(&workspace.config);

        let bag = collect_version_info(&workspace.repo, &identity, registry, &options).await?;
        match cli.format {
            OutputFormat::Json => output::json(&self.to_json(&bag)),
            OutputFormat::Text => {
                self.print(&bag, &identity.to_string(), cli.quiet);
                Ok(())
            }
        }
    }

    fn to_json(&self, bag: &ReferenceVersionBag) -> serde_json::Value {
        let entries: Vec<_> = bag
            .entries()
            .filter(|(id, _)| !self.need_bump || bag.need_bump(id))
            .map(|(id, reference)| {
                serde_json::json!({
                    "name": id.to_string(),
                    "version": reference.version,
                    "reference": reference.reference,
                    "published": reference.published,
                    "need_bump": bag.need_bump(id),
                    "need_release": bag.need_release(id),
                })
            })
            .collect();
        serde_json::json!({ "dependencies": entries })
    }

    fn print(&self, bag: &ReferenceVersionBag, target: &str, quiet: bool) {
        if !quiet {
            println!("{}", output::header(&format!("Dependencies of {}", target)));
            println!();
        }
        for (id, reference) in bag.entries() {
            let need_bump = bag.need_bump(id);
            if self.need_bump && !need_bump {
                continue;
            }
            if quiet {
                println!("{}@{}", id, reference.version);
                continue;
            }
            let marker = if bag.need_release(id) {
                style("release").red().to_string()
            } else if need_bump {
                style("bump").yellow().to_string()
            } else if reference.published {
                style("published").dim().to_string()
            } else {
                String::new()
            };
            println!(
                "  {:<30} {:<16} {:<10} {}",
                id.to_string(),
                output::version_style().apply_to(&reference.version),
                marker,
                style(&reference.reference).dim()
            );
        }
    }
}
