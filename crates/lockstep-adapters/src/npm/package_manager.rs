//! npm package manager commands

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use lockstep_core::collab::PackageManager;
use lockstep_core::config::CommandsConfig;
use lockstep_core::error::{AdapterError, Result};
use lockstep_core::monorepo::Package;

use crate::command::{check_success, run_program, run_shell};

/// Runs installs, version updates and scripts through npm
pub struct NpmPackageManager {
    install_command: String,
    timeout: Duration,
}

impl NpmPackageManager {
    /// Create a package manager running `install_command` for installs
    pub fn new(install_command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            install_command: install_command.into(),
            timeout,
        }
    }

    /// Create a package manager from configuration
    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new(config.install.clone(), config.timeout())
    }

    fn npm(&self) -> Result<PathBuf> {
        which::which("npm").map_err(|e| {
            AdapterError::CommandFailed {
                command: "npm".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn npm_in(&self, dir: &Path, args: &[&str]) -> Result<()> {
        let npm = self.npm()?;
        let output = run_program(&npm, args, dir, self.timeout).await?;
        check_success(&format!("npm {}", args.join(" ")), &output)
    }
}

#[async_trait]
impl PackageManager for NpmPackageManager {
    #[instrument(skip(self, directories), fields(count = directories.len()))]
    async fn install(&self, directories: &[PathBuf]) -> Result<bool> {
        let mut ok = true;
        for dir in directories {
            info!(dir = %dir.display(), command = %self.install_command, "installing");
            let output = run_shell(&self.install_command, dir, self.timeout).await?;
            if let Err(e) = check_success(&self.install_command, &output) {
                warn!(dir = %dir.display(), error = %e, "install failed");
                ok = false;
            }
        }
        Ok(ok)
    }

    async fn set_version(&self, package: &Package, version: &str) -> Result<()> {
        info!(package = %package.name, version, "setting version");
        self.npm_in(
            &package.directory,
            &[
                "version",
                version,
                "--no-git-tag-version",
                "--allow-same-version",
            ],
        )
        .await
    }

    async fn run_script(&self, package: &Package, script: &str) -> Result<()> {
        info!(package = %package.name, script, "running script");
        self.npm_in(&package.directory, &["run", script]).await
    }
}
