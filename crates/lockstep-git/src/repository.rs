//! Git repository handle and subprocess runner

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use git2::Repository;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use lockstep_core::error::{GitError, Result};

/// Default timeout for a single git subprocess
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Git repository rooted at a working directory.
///
/// Only the path is kept; `git2` handles are opened per call so the type
/// stays `Sync`.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    timeout: Duration,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;
        Ok(Self::from_repository(&repo))
    }

    /// Discover and open a repository by searching parent directories
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        info!(start_path = %start_path.display(), "discovering git repository");
        let repo = Repository::discover(start_path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(start_path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;
        Ok(Self::from_repository(&repo))
    }

    fn from_repository(repo: &Repository) -> Self {
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        Self {
            path,
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Use a different subprocess timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subprocess timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Name of the checked out branch, read through git2
    pub(crate) fn head_branch(&self) -> Result<String> {
        let repo = Repository::open(&self.path).map_err(|e| GitError::OpenFailed(e.to_string()))?;
        let branch = match repo.head() {
            Ok(head) if head.is_branch() => head
                .shorthand()
                .map(str::to_string)
                .ok_or_else(|| GitError::Git2("branch name is not valid UTF-8".to_string()).into()),
            Ok(_) => Err(GitError::DetachedHead.into()),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                // No commits yet: HEAD still names the branch it will create
                let head = repo
                    .find_reference("HEAD")
                    .map_err(|e| GitError::Git2(e.to_string()))?;
                head.symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or_else(|| GitError::DetachedHead.into())
            }
            Err(e) => Err(GitError::Git2(e.to_string()).into()),
        };
        branch
    }

    /// Run git and return its raw output, whatever the exit status
    pub(crate) async fn output(
        &self,
        label: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<Output> {
        debug!(label, args = ?args, "running git");
        let start = Instant::now();

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.path)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = async {
            let mut child = cmd.spawn()?;
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                pipe.write_all(input.as_bytes()).await?;
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| GitError::Timeout {
                label: label.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| GitError::CommandFailed {
                label: label.to_string(),
                stderr: e.to_string(),
            })?;

        debug!(
            label,
            duration_ms = start.elapsed().as_millis(),
            success = output.status.success(),
            "git finished"
        );
        Ok(output)
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit
    pub(crate) async fn run(&self, label: &str, args: &[&str]) -> Result<String> {
        self.run_with_input(label, args, None).await
    }

    pub(crate) async fn run_with_input(
        &self,
        label: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<String> {
        let output = self.output(label, args, stdin).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(GitError::CommandFailed {
                label: label.to_string(),
                stderr,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Resolve a ref to a commit sha, `None` when it does not exist
    pub(crate) async fn rev_parse(&self, label: &str, reference: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", reference);
        let output = self
            .output(label, &["rev-parse", "--verify", "--quiet", &spec], None)
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{RepositoryInitOptions, Signature};
    use tempfile::TempDir;

    /// Repository on `main` with one commit and a local identity
    pub(crate) fn setup_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(temp.path(), &opts).unwrap();

        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
        config.set_bool("tag.gpgsign", false).unwrap();

        std::fs::write(temp.path().join("file.txt"), "content").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("file.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();

        let git_repo = GitRepo::open(temp.path()).unwrap();
        (temp, git_repo)
    }

    #[test]
    fn test_open_repo() {
        let (_temp, repo) = setup_repo();
        assert_eq!(repo.timeout(), DEFAULT_GIT_TIMEOUT);
        assert_eq!(repo.head_branch().unwrap(), "main");
    }

    #[test]
    fn test_discover_repo() {
        let (temp, _) = setup_repo();
        let subdir = temp.path().join("sub").join("dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let repo = GitRepo::discover(&subdir).unwrap();
        // Canonicalize both paths to handle macOS /var -> /private/var symlink
        let repo_path = repo.path().canonicalize().unwrap();
        let temp_path = temp.path().canonicalize().unwrap();
        assert_eq!(repo_path, temp_path);
    }

    #[test]
    fn test_not_a_repo() {
        let temp = TempDir::new().unwrap();
        assert!(GitRepo::open(temp.path()).is_err());
    }

    #[test]
    fn test_unborn_branch() {
        let temp = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("next");
        Repository::init_opts(temp.path(), &opts).unwrap();
        let repo = GitRepo::open(temp.path()).unwrap();
        assert_eq!(repo.head_branch().unwrap(), "next");
    }

    #[tokio::test]
    async fn test_failed_command_carries_label() {
        let (_temp, repo) = setup_repo();
        let err = repo
            .run("check out missing branch", &["checkout", "does-not-exist"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("check out missing branch"));
    }

    #[tokio::test]
    async fn test_rev_parse_missing_ref() {
        let (_temp, repo) = setup_repo();
        assert!(repo.rev_parse("sha", "refs/heads/main").await.unwrap().is_some());
        assert!(repo.rev_parse("sha", "refs/heads/nope").await.unwrap().is_none());
    }
}
