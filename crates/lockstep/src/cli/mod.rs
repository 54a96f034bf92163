//! CLI definition and command handling

pub mod commands;
pub mod output;
mod workspace;

use clap::{Parser, Subcommand};

use commands::{
    BumpCommand, BumpDepsCommand, InfoCommand, InitCommand, ReleaseBumpCommand, ReleaseCommand,
    VersionsCommand,
};

/// Lockstep - monorepo version and release management CLI
#[derive(Debug, Parser)]
#[command(name = "lockstep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    /// Switch back to the original branch and delete created branches and
    /// tags when a command fails
    #[arg(long, global = true, env = "LOCKSTEP_CLEAN_ON_ERROR")]
    pub clean_on_error: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a starter configuration file
    Init(InitCommand),

    /// Bump the version of a release group or package
    Bump(BumpCommand),

    /// Point dependents at new versions of a release group or package
    BumpDeps(BumpDepsCommand),

    /// Run the release handshake on a release branch
    Release(ReleaseCommand),

    /// Start a new release cycle from a main branch
    ReleaseBump(ReleaseBumpCommand),

    /// Show reconciled dependency versions for a release group or package
    Info(InfoCommand),

    /// List current versions of every release group and package
    Versions(VersionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Bump(ref cmd) => cmd.execute(&self),
            Commands::BumpDeps(ref cmd) => cmd.execute(&self),
            Commands::Release(ref cmd) => cmd.execute(&self),
            Commands::ReleaseBump(ref cmd) => cmd.execute(&self),
            Commands::Info(ref cmd) => cmd.execute(&self),
            Commands::Versions(ref cmd) => cmd.execute(&self),
        }
    }
}
