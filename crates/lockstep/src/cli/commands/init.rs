//! Init command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use lockstep_core::config::{default_config_yaml, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};

use crate::cli::{output, Cli, OutputFormat};

/// Write a starter configuration file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Write the bare defaults instead of the annotated template
    #[arg(long)]
    pub minimal: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, minimal = self.minimal, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_YAML));

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let content = if self.minimal {
            default_config_yaml()
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };
        std::fs::write(&config_path, content)?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "path": config_path.display().to_string(),
            }))?,
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!("Created {}", config_path.display()));
                    output::info("Edit the release groups and packages to match your repository");
                }
            }
        }
        Ok(())
    }
}
