//! Loading the repository and wiring collaborators for a command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::{info, warn};

use lockstep_adapters::{CommandPolicyCheck, NpmPackageManager, NpmRegistry, PackageJsonWriter};
use lockstep_core::config::{config_root, load_config_from_dir, Config};
use lockstep_core::error::LockstepError;
use lockstep_core::monorepo::Context;
use lockstep_core::workflow::{Collaborators, ReleaseContext};
use lockstep_git::GitRepo;

use super::Cli;

/// Configuration and repository model for the current directory
pub struct Workspace {
    pub config: Config,
    pub root: PathBuf,
    pub repo: Context,
}

impl Workspace {
    /// Find the configuration and load every package it describes
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_from_dir(&cwd)?;
        let root = config_root(&config_path);
        info!(root = %root.display(), config = %config_path.display(), "loading workspace");
        let repo = Context::load(&root, &config.layout)
            .with_context(|| format!("Failed to load packages under {}", root.display()))?;
        Ok(Self { config, root, repo })
    }

    /// Registry client configured for this workspace
    pub fn registry(&self) -> anyhow::Result<NpmRegistry> {
        Ok(NpmRegistry::from_config(&self.config.registry)?)
    }

    /// Build a release context with the production collaborators
    pub async fn into_release_context(self) -> anyhow::Result<ReleaseContext> {
        let git = GitRepo::discover(&self.root)?.with_timeout(self.config.commands.git_timeout());
        let collab = Collaborators {
            git: Arc::new(git),
            registry: Arc::new(self.registry()?),
            package_manager: Arc::new(NpmPackageManager::from_config(&self.config.commands)),
            manifests: Arc::new(PackageJsonWriter::new()),
            policy: Arc::new(CommandPolicyCheck::from_config(
                &self.config.commands,
                &self.root,
            )),
        };
        Ok(ReleaseContext::new(self.repo, self.config, collab).await?)
    }
}

/// Turn a workflow result into a command result, rolling back first when
/// requested and the failure may have left changes behind.
pub async fn finish<T>(
    rc: &mut ReleaseContext,
    cli: &Cli,
    result: Result<T, LockstepError>,
) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if cli.clean_on_error && e.requires_rollback() {
                warn!(error = %e, "command failed, cleaning up");
                if let Err(cleanup) = rc.clean_up().await {
                    warn!(error = %cleanup, "clean up incomplete");
                }
            }
            Err(e.into())
        }
    }
}
