//! Versions command

use std::collections::BTreeMap;

use clap::Args;
use tracing::info;

use crate::cli::workspace::Workspace;
use crate::cli::{output, Cli, OutputFormat};

/// List current versions of every release group and package
#[derive(Debug, Args)]
pub struct VersionsCommand {}

impl VersionsCommand {
    /// Execute the versions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing versions command");
        let workspace = Workspace::load()?;
        let bag = workspace.repo.collect_versions()?;

        match cli.format {
            OutputFormat::Json => {
                let versions: BTreeMap<String, &str> =
                    bag.iter().map(|(id, v)| (id.to_string(), v)).collect();
                output::json(&serde_json::to_value(versions)?)?;
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", output::header("Versions"));
                }
                for (id, version) in bag.iter() {
                    println!(
                        "{}",
                        output::key_value(
                            &id.to_string(),
                            &output::version_style().apply_to(version).to_string()
                        )
                    );
                }
            }
        }
        Ok(())
    }
}
