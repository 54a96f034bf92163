//! Release context: repository state plus collaborators for one run

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bag::{ReferenceVersionBag, VersionBag};
use crate::collab::{GitOps, ManifestWriter, PackageManager, PolicyCheck, Registry};
use crate::config::Config;
use crate::error::{GitError, Result, WorkflowError};
use crate::monorepo::{Context, Identity};
use crate::reconcile::{collect_version_info, ReconcileOptions};
use crate::scheme::{detect_scheme, VersionSchemeKind};

/// External collaborators used by the workflows
#[derive(Clone)]
pub struct Collaborators {
    /// Git operations
    pub git: Arc<dyn GitOps>,
    /// Registry lookups
    pub registry: Arc<dyn Registry>,
    /// Package manager commands
    pub package_manager: Arc<dyn PackageManager>,
    /// Manifest persistence
    pub manifests: Arc<dyn ManifestWriter>,
    /// Policy checker
    pub policy: Arc<dyn PolicyCheck>,
}

/// State shared by the workflows of one invocation.
///
/// Tracks the branch the run started on and every branch and tag it
/// creates, so [`clean_up`](Self::clean_up) can roll the checkout back.
pub struct ReleaseContext {
    /// Repository model
    pub repo: Context,
    /// Loaded configuration
    pub config: Config,
    collab: Collaborators,
    original_branch: String,
    new_branches: Vec<String>,
    new_tags: Vec<String>,
}

impl ReleaseContext {
    /// Create a context, remembering the currently checked out branch
    pub async fn new(repo: Context, config: Config, collab: Collaborators) -> Result<Self> {
        let original_branch = collab.git.current_branch().await?;
        debug!(branch = %original_branch, "starting release context");
        Ok(Self {
            repo,
            config,
            collab,
            original_branch,
            new_branches: Vec::new(),
            new_tags: Vec::new(),
        })
    }

    /// Git collaborator
    pub fn git(&self) -> &dyn GitOps {
        self.collab.git.as_ref()
    }

    /// Package manager collaborator
    pub fn package_manager(&self) -> &dyn PackageManager {
        self.collab.package_manager.as_ref()
    }

    /// Manifest writer collaborator
    pub fn manifests(&self) -> &dyn ManifestWriter {
        self.collab.manifests.as_ref()
    }

    /// Branch the run started on
    pub fn original_branch(&self) -> &str {
        &self.original_branch
    }

    /// Branches created during this run
    pub fn new_branches(&self) -> &[String] {
        &self.new_branches
    }

    /// Tags created during this run
    pub fn new_tags(&self) -> &[String] {
        &self.new_tags
    }

    /// Current versions, optionally re-reading every manifest first
    pub fn collect_versions(&mut self, reload: bool) -> Result<VersionBag> {
        if reload {
            self.repo.reload()?;
        }
        self.repo.collect_versions()
    }

    /// Reconcile the dependency graph of a release group or package
    pub async fn collect_version_info(&self, target: &Identity) -> Result<ReferenceVersionBag> {
        collect_version_info(
            &self.repo,
            target,
            Arc::clone(&self.collab.registry),
            &ReconcileOptions::from_config(&self.config),
        )
        .await
    }

    /// Create a branch and switch to it. Fails if the branch already exists.
    pub async fn create_branch(&mut self, branch: &str) -> Result<()> {
        if self.git().branch_sha(branch, None).await?.is_some() {
            return Err(GitError::BranchExists(branch.to_string()).into());
        }
        self.git().create_branch(branch).await?;
        info!(branch, "created branch");
        self.new_branches.push(branch.to_string());
        Ok(())
    }

    /// Create a tag at HEAD and record it
    pub async fn create_tag(&mut self, tag: &str) -> Result<()> {
        self.git().create_tag(tag).await?;
        info!(tag, "created tag");
        self.new_tags.push(tag.to_string());
        Ok(())
    }

    /// Switch back to the original branch and delete everything this run
    /// created.
    ///
    /// Keeps going after individual failures and reports the first one.
    pub async fn clean_up(&mut self) -> Result<()> {
        info!(branch = %self.original_branch, "cleaning up");
        let mut first_error = None;

        if let Err(e) = self.git().switch_branch(&self.original_branch).await {
            warn!(error = %e, "failed to switch back to original branch");
            first_error.get_or_insert(e);
        }
        for branch in std::mem::take(&mut self.new_branches) {
            if let Err(e) = self.git().delete_branch(&branch).await {
                warn!(branch = %branch, error = %e, "failed to delete branch");
                first_error.get_or_insert(e);
            }
        }
        for tag in std::mem::take(&mut self.new_tags) {
            if let Err(e) = self.git().delete_tag(&tag).await {
                warn!(tag = %tag, error = %e, "failed to delete tag");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run the policy checker in fix mode; fail if it changed anything
    pub async fn check_policy(&self) -> Result<()> {
        info!("running policy check");
        if self.collab.policy.run_fix().await? {
            return Ok(());
        }
        let status = self.git().status().await?;
        Err(WorkflowError::PolicyCheckDirty(status.trim().to_string()).into())
    }

    /// Name of the upstream remote
    pub async fn remote(&self) -> Result<String> {
        let partial = self.config.repo.remote_url.as_deref().ok_or_else(|| {
            GitError::RemoteNotFound("no repo.remote_url configured".to_string())
        })?;
        self.git()
            .remote_by_partial_url(partial)
            .await?
            .ok_or_else(|| GitError::RemoteNotFound(partial.to_string()).into())
    }

    /// Fail unless `branch` matches its remote counterpart. Returns the remote.
    pub async fn ensure_up_to_date(&self, branch: &str) -> Result<String> {
        let remote = self.remote().await?;
        if !self.git().is_branch_up_to_date(branch, &remote).await? {
            return Err(WorkflowError::BranchNotUpToDate {
                branch: branch.to_string(),
                remote,
            }
            .into());
        }
        debug!(branch, remote = %remote, "branch is up to date");
        Ok(remote)
    }

    /// Install dependencies for a target, or for the whole repository
    pub async fn install(&self, target: Option<&Identity>) -> Result<()> {
        let directories: Vec<PathBuf> = match target {
            Some(Identity::ReleaseGroup(kind)) => self
                .repo
                .release_group(kind)
                .map(|g| vec![g.repo_path.clone()])
                .unwrap_or_default(),
            Some(Identity::Package(name)) => self
                .repo
                .package(name)
                .map(|p| vec![p.directory.clone()])
                .unwrap_or_default(),
            None => vec![self.repo.root().to_path_buf()],
        };

        info!(directories = directories.len(), "installing dependencies");
        if !self.package_manager().install(&directories).await? {
            let target = target.map_or_else(|| "repository".to_string(), ToString::to_string);
            return Err(WorkflowError::InstallFailed(target).into());
        }
        Ok(())
    }

    /// Stage everything and commit
    pub async fn commit(&self, message: &str) -> Result<()> {
        self.git().add_all().await?;
        self.git().commit(message).await?;
        info!(summary = message.lines().next().unwrap_or_default(), "committed");
        Ok(())
    }

    /// Version scheme for an identity.
    ///
    /// A release group's configured scheme wins, then the repository default,
    /// then whatever the current version looks like.
    pub fn scheme_for(&self, identity: &Identity) -> VersionSchemeKind {
        if let Identity::ReleaseGroup(kind) = identity {
            let configured = self
                .config
                .layout
                .release_groups
                .iter()
                .find(|g| &g.kind == kind)
                .and_then(|g| g.scheme);
            if let Some(scheme) = configured {
                return scheme;
            }
        }
        self.config
            .versioning
            .scheme
            .unwrap_or_else(|| detect_scheme(self.repo.version_of(identity).unwrap_or_default()))
    }

    /// Publish tag for an identity at a version
    pub fn publish_tag(&self, identity: &Identity, version: &str) -> String {
        self.config
            .versioning
            .format_tag(identity.short_name(), version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monorepo::MonoRepoKind;
    use crate::testing::{release_context, MockGit, MockPackageManager, MockRegistry, RepoFixture};

    fn fixture() -> RepoFixture {
        RepoFixture::new().group_package("client", "app", "1.2.0", &[], &[])
    }

    #[tokio::test]
    async fn test_create_branch_fails_when_exists() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("main"));
        let mut rc = release_context(
            &fixture,
            git.clone(),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        rc.create_branch("work").await.unwrap();
        let err = rc.create_branch("work").await.unwrap_err();
        assert!(err.to_string().contains("work"));
        assert_eq!(rc.new_branches().to_vec(), vec!["work".to_string()]);
    }

    #[tokio::test]
    async fn test_clean_up_restores_branch_and_deletes_created_refs() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("main"));
        let mut rc = release_context(
            &fixture,
            git.clone(),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        rc.create_branch("work").await.unwrap();
        rc.create_tag("client_v1.2.0").await.unwrap();
        rc.clean_up().await.unwrap();

        assert_eq!(git.current_branch_name(), "main");
        assert!(!git.branches().contains("work"));
        assert!(git.tags().is_empty());
        assert!(rc.new_branches().is_empty());
    }

    #[tokio::test]
    async fn test_missing_remote_is_fatal() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("main").without_remote());
        let rc = release_context(
            &fixture,
            git,
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let err = rc.ensure_up_to_date("main").await.unwrap_err();
        assert!(err.to_string().contains("github.com/example/repo"));
    }

    #[tokio::test]
    async fn test_install_failure() {
        let fixture = fixture();
        let pm = Arc::new(MockPackageManager {
            fail_install: true,
            ..Default::default()
        });
        let rc = release_context(
            &fixture,
            Arc::new(MockGit::on_branch("main")),
            MockRegistry::new(),
            pm,
        )
        .await;

        let target = Identity::ReleaseGroup(MonoRepoKind::client());
        assert!(rc.install(Some(&target)).await.is_err());
    }

    #[tokio::test]
    async fn test_scheme_and_tag() {
        let fixture = RepoFixture::new().package("@scope/legacy", "0.45.2000", &[], &[]);
        let rc = release_context(
            &fixture,
            Arc::new(MockGit::on_branch("main")),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let id = Identity::Package("@scope/legacy".to_string());
        assert_eq!(rc.scheme_for(&id), VersionSchemeKind::VirtualPatch);
        assert_eq!(rc.publish_tag(&id, "0.45.2000"), "legacy_v0.45.2000");
    }
}
