//! Policy check gate

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use lockstep_core::collab::PolicyCheck;
use lockstep_core::config::CommandsConfig;
use lockstep_core::error::Result;

use crate::command::{check_success, run_program, run_shell};

/// Runs the configured policy command in fix mode, then asks git whether
/// anything changed.
pub struct CommandPolicyCheck {
    command: Option<String>,
    root: PathBuf,
    timeout: Duration,
}

impl CommandPolicyCheck {
    /// Create a check running `command` at `root`. Without a command only the
    /// working tree is checked.
    pub fn new(command: Option<String>, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command,
            root: root.into(),
            timeout,
        }
    }

    /// Create a check from configuration
    pub fn from_config(config: &CommandsConfig, root: &Path) -> Self {
        Self::new(config.policy_check.clone(), root, config.timeout())
    }
}

#[async_trait]
impl PolicyCheck for CommandPolicyCheck {
    async fn run_fix(&self) -> Result<bool> {
        match &self.command {
            Some(command) => {
                info!(command = %command, "running policy check");
                let output = run_shell(command, &self.root, self.timeout).await?;
                check_success(command, &output)?;
            }
            None => debug!("no policy check configured"),
        }

        let output = run_program(
            Path::new("git"),
            &["status", "--porcelain"],
            &self.root,
            self.timeout,
        )
        .await?;
        check_success("git status --porcelain", &output)?;
        let clean = output.stdout.iter().all(u8::is_ascii_whitespace);
        debug!(clean, "working tree checked");
        Ok(clean)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn git_init(dir: &Path) {
        let output = run_program(Path::new("git"), &["init"], dir, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(output.status.success());
    }

    #[tokio::test]
    async fn test_clean_tree() {
        let temp = TempDir::new().unwrap();
        git_init(temp.path()).await;

        let check = CommandPolicyCheck::new(Some("true".to_string()), temp.path(), Duration::from_secs(10));
        assert!(check.run_fix().await.unwrap());
    }

    #[tokio::test]
    async fn test_fix_leaves_changes() {
        let temp = TempDir::new().unwrap();
        git_init(temp.path()).await;

        let check = CommandPolicyCheck::new(
            Some("echo fixed > policy.txt".to_string()),
            temp.path(),
            Duration::from_secs(10),
        );
        assert!(!check.run_fix().await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_command() {
        let temp = TempDir::new().unwrap();
        git_init(temp.path()).await;

        let check = CommandPolicyCheck::new(Some("exit 2".to_string()), temp.path(), Duration::from_secs(10));
        assert!(check.run_fix().await.is_err());
    }
}
