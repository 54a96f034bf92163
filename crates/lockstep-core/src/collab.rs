//! Collaborator interfaces
//!
//! Workflows reach git, the package registry, the package manager, manifest
//! persistence and the policy checker only through these traits. Production
//! implementations live in `lockstep-git` and `lockstep-adapters`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::monorepo::Package;

/// Git operations on the working repository
#[async_trait]
pub trait GitOps: Send + Sync {
    /// Name of the remote whose URL contains `partial_url`
    async fn remote_by_partial_url(&self, partial_url: &str) -> Result<Option<String>>;

    /// Commit sha of a local branch, or of `remote/branch` when a remote is given
    async fn branch_sha(&self, branch: &str, remote: Option<&str>) -> Result<Option<String>>;

    /// Commit sha a tag points to
    async fn tag_sha(&self, tag: &str) -> Result<Option<String>>;

    /// Fetch `remote` and compare the local branch with its remote counterpart
    async fn is_branch_up_to_date(&self, branch: &str, remote: &str) -> Result<bool>;

    /// Currently checked out branch
    async fn current_branch(&self) -> Result<String>;

    /// Create a branch at HEAD and switch to it
    async fn create_branch(&self, branch: &str) -> Result<()>;

    /// Switch to an existing branch
    async fn switch_branch(&self, branch: &str) -> Result<()>;

    /// Delete a local branch
    async fn delete_branch(&self, branch: &str) -> Result<()>;

    /// Stage every change in the working tree
    async fn add_all(&self) -> Result<()>;

    /// Commit staged changes
    async fn commit(&self, message: &str) -> Result<()>;

    /// Create a lightweight tag at HEAD
    async fn create_tag(&self, tag: &str) -> Result<()>;

    /// Delete a local tag
    async fn delete_tag(&self, tag: &str) -> Result<()>;

    /// Push a tag to a remote
    async fn push_tag(&self, tag: &str, remote: &str) -> Result<()>;

    /// Porcelain status output; empty when the tree is clean
    async fn status(&self) -> Result<String>;

    /// Best common ancestor of two commits
    async fn merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// Commits reachable from `branch` but not from `commit`
    async fn rev_list(&self, commit: &str, branch: &str) -> Result<Vec<String>>;

    /// Merge `commit` into HEAD, aborting on conflict. Returns whether it merged.
    async fn merge_or_abort(&self, commit: &str) -> Result<bool>;
}

/// Package registry lookups
#[async_trait]
pub trait Registry: Send + Sync {
    /// Highest published version of `name` satisfying `range`
    async fn resolve_version(&self, name: &str, range: &str) -> Result<Option<String>>;

    /// Dependencies declared by a published version (`devDependencies` when `dev`)
    async fn manifest_dependencies(
        &self,
        name: &str,
        version: &str,
        dev: bool,
    ) -> Result<BTreeMap<String, String>>;
}

/// Persists package changes back to disk
#[async_trait]
pub trait ManifestWriter: Send + Sync {
    /// Write the package's version and dependency ranges to its manifest
    async fn save_package(&self, package: &Package) -> Result<()>;
}

/// Repository policy checker
#[async_trait]
pub trait PolicyCheck: Send + Sync {
    /// Run the checker in fix mode. Returns true when nothing needed fixing.
    async fn run_fix(&self) -> Result<bool>;
}

/// Package manager commands
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install dependencies in each directory. Returns false if any install failed.
    async fn install(&self, directories: &[PathBuf]) -> Result<bool>;

    /// Set a package's version
    async fn set_version(&self, package: &Package, version: &str) -> Result<()>;

    /// Run a script defined by the package
    async fn run_script(&self, package: &Package, script: &str) -> Result<()>;
}
