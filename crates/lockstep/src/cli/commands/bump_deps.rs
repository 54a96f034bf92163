//! Bump dependencies command

use std::collections::BTreeMap;

use clap::Args;
use tracing::info;

use lockstep_core::monorepo::{Identity, MonoRepoKind};
use lockstep_core::workflow::{bump_dependencies, DependencyBumpOptions};

use crate::cli::workspace::{finish, Workspace};
use crate::cli::{output, Cli, OutputFormat};

/// Point dependents at new versions of a release group or package
#[derive(Debug, Args)]
pub struct BumpDepsCommand {
    /// Targets as `name` or `name@version`; a bare name uses its current version
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Write prerelease-tolerant ranges (`^x.y.z-0`)
    #[arg(long)]
    pub prerelease: bool,

    /// Only rewrite packages in this release group
    #[arg(long)]
    pub scope: Option<String>,

    /// Install dependencies after rewriting
    #[arg(long)]
    pub install: bool,

    /// Create this branch and commit the result to it
    #[arg(long)]
    pub branch: Option<String>,
}

impl BumpDepsCommand {
    /// Execute the bump-deps command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(targets = ?self.targets, prerelease = self.prerelease, "executing bump-deps command");
        let workspace = Workspace::load()?;

        let mut bumps: BTreeMap<Identity, Option<String>> = BTreeMap::new();
        for target in &self.targets {
            let (name, version) = split_target(target);
            let identity = workspace.repo.resolve_target(name)?;
            bumps.insert(identity, version.map(str::to_string));
        }

        let options = DependencyBumpOptions {
            scope: self.scope.as_deref().map(MonoRepoKind::new),
            prerelease: self.prerelease,
            install: self.install,
            branch: self.branch.clone(),
        };

        let mut rc = workspace.into_release_context().await?;
        let result = bump_dependencies(&mut rc, &bumps, &options).await;
        let changed = finish(&mut rc, cli, result).await?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "changed": changed,
                "branch": self.branch,
            }))?,
            OutputFormat::Text => {
                if cli.quiet {
                    return Ok(());
                }
                if changed.is_empty() {
                    output::info("No dependency ranges changed");
                    return Ok(());
                }
                output::success(&format!("Updated {} package(s)", changed.len()));
                for name in &changed {
                    println!("  {}", name);
                }
                if let Some(branch) = &self.branch {
                    println!("{}", output::key_value("Branch", branch));
                }
            }
        }
        Ok(())
    }
}

/// Split `name@version`, keeping a leading `@` of scoped names
fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.rfind('@') {
        Some(idx) if idx > 0 => (&target[..idx], Some(&target[idx + 1..])),
        _ => (target, None),
    }
}
