//! Test fixtures and mock collaborators

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::collab::{GitOps, ManifestWriter, PackageManager, PolicyCheck, Registry};
use crate::config::{Config, PackageConfig, ReleaseGroupConfig};
use crate::error::{GitError, Result};
use crate::monorepo::{Context, MonoRepoKind, Package, MANIFEST_FILE};
use crate::range::NpmRange;
use crate::workflow::{Collaborators, ReleaseContext};

type Deps<'a> = &'a [(&'a str, &'a str)];

/// On-disk repository built from package descriptions
pub struct RepoFixture {
    dir: TempDir,
    kinds: BTreeSet<String>,
    labels: BTreeSet<String>,
}

impl RepoFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            kinds: BTreeSet::new(),
            labels: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Independent package
    pub fn package(self, name: &str, version: &str, deps: Deps, dev_deps: Deps) -> Self {
        let dir = self.root().join("packages").join(dir_name(name));
        write_manifest(&dir, name, version, false, deps, dev_deps, &[]);
        self
    }

    /// Private independent package
    pub fn private_package(self, name: &str, version: &str) -> Self {
        let dir = self.root().join("packages").join(dir_name(name));
        write_manifest(&dir, name, version, true, &[], &[], &[]);
        self
    }

    /// Independent package carrying a group label
    pub fn grouped_package(mut self, group: &str, name: &str, version: &str) -> Self {
        self.labels.insert(group.to_string());
        let dir = self.root().join(group).join(dir_name(name));
        write_manifest(&dir, name, version, false, &[], &[], &[]);
        self
    }

    /// Release group member
    pub fn group_package(
        mut self,
        kind: &str,
        name: &str,
        version: &str,
        deps: Deps,
        dev_deps: Deps,
    ) -> Self {
        self.kinds.insert(kind.to_string());
        let dir = self
            .root()
            .join(kind)
            .join("packages")
            .join(dir_name(name));
        write_manifest(&dir, name, version, false, deps, dev_deps, &[]);
        self
    }

    /// Release group member defining scripts
    pub fn group_package_with_scripts(
        mut self,
        kind: &str,
        name: &str,
        version: &str,
        scripts: &[&str],
    ) -> Self {
        self.kinds.insert(kind.to_string());
        let dir = self
            .root()
            .join(kind)
            .join("packages")
            .join(dir_name(name));
        write_manifest(&dir, name, version, false, &[], &[], scripts);
        self
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.repo.remote_url = Some("github.com/example/repo".to_string());
        config.layout.release_groups = self
            .kinds
            .iter()
            .map(|kind| ReleaseGroupConfig {
                kind: MonoRepoKind::new(kind.as_str()),
                directory: PathBuf::from(kind),
                packages: vec!["packages/*".to_string()],
                scheme: None,
            })
            .collect();
        config.layout.packages = std::iter::once(PackageConfig {
            pattern: "packages/*".to_string(),
            group: None,
        })
        .chain(self.labels.iter().map(|label| PackageConfig {
            pattern: format!("{}/*", label),
            group: Some(label.clone()),
        }))
        .collect();
        config
    }

    pub fn context(&self) -> Context {
        Context::load(self.root(), &self.config().layout).unwrap()
    }
}

fn dir_name(name: &str) -> String {
    name.trim_start_matches('@').replace('/', "-")
}

fn write_manifest(
    dir: &Path,
    name: &str,
    version: &str,
    private: bool,
    deps: Deps,
    dev_deps: Deps,
    scripts: &[&str],
) {
    let map = |deps: Deps| {
        deps.iter()
            .map(|(n, r)| (n.to_string(), serde_json::Value::String(r.to_string())))
            .collect::<serde_json::Map<_, _>>()
    };
    let scripts = scripts
        .iter()
        .map(|s| (s.to_string(), serde_json::Value::String("true".to_string())))
        .collect::<serde_json::Map<_, _>>();
    let manifest = serde_json::json!({
        "name": name,
        "version": version,
        "private": private,
        "scripts": scripts,
        "dependencies": map(deps),
        "devDependencies": map(dev_deps),
    });
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
}

fn update_manifest(path: &Path, f: impl FnOnce(&mut serde_json::Value)) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let mut manifest: serde_json::Value = serde_json::from_str(&content)?;
    f(&mut manifest);
    std::fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

struct PublishedVersion {
    version: String,
    deps: BTreeMap<String, String>,
    dev_deps: BTreeMap<String, String>,
}

/// Registry serving a fixed set of published versions, counting calls
#[derive(Default)]
pub struct MockRegistry {
    published: BTreeMap<String, Vec<PublishedVersion>>,
    resolve_calls: AtomicUsize,
    manifest_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(mut self, name: &str, version: &str, deps: Deps, dev_deps: Deps) -> Self {
        let collect = |deps: Deps| {
            deps.iter()
                .map(|(n, r)| (n.to_string(), r.to_string()))
                .collect()
        };
        self.published
            .entry(name.to_string())
            .or_default()
            .push(PublishedVersion {
                version: version.to_string(),
                deps: collect(deps),
                dev_deps: collect(dev_deps),
            });
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn resolve_version(&self, name: &str, range: &str) -> Result<Option<String>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let range = NpmRange::parse(range)?;
        let versions = self.published.get(name);
        Ok(range
            .max_satisfying(versions.into_iter().flatten().map(|p| p.version.as_str()))
            .map(|v| v.to_string()))
    }

    async fn manifest_dependencies(
        &self,
        name: &str,
        version: &str,
        dev: bool,
    ) -> Result<BTreeMap<String, String>> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        let found = self
            .published
            .get(name)
            .into_iter()
            .flatten()
            .find(|p| p.version == version);
        Ok(match found {
            Some(p) if dev => p.dev_deps.clone(),
            Some(p) => p.deps.clone(),
            None => BTreeMap::new(),
        })
    }
}

/// In-memory git state
#[derive(Debug, Default)]
pub struct MockGitState {
    pub current_branch: String,
    pub branches: BTreeSet<String>,
    pub remote_branches: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub commits: Vec<String>,
    pub up_to_date: bool,
    pub remote: Option<String>,
    pub status: String,
}

/// Git double recording every mutation
pub struct MockGit {
    pub state: Mutex<MockGitState>,
}

impl MockGit {
    /// Repository on `branch`, up to date with an `origin` remote
    pub fn on_branch(branch: &str) -> Self {
        Self {
            state: Mutex::new(MockGitState {
                current_branch: branch.to_string(),
                branches: BTreeSet::from([branch.to_string()]),
                up_to_date: true,
                remote: Some("origin".to_string()),
                ..Default::default()
            }),
        }
    }

    pub fn with_tags(self, tags: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .tags
            .extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn with_remote_branch(self, branch: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .remote_branches
            .insert(branch.to_string());
        self
    }

    pub fn stale(self) -> Self {
        self.state.lock().unwrap().up_to_date = false;
        self
    }

    pub fn without_remote(self) -> Self {
        self.state.lock().unwrap().remote = None;
        self
    }

    pub fn current_branch_name(&self) -> String {
        self.state.lock().unwrap().current_branch.clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn branches(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().branches.clone()
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().tags.clone()
    }
}

#[async_trait]
impl GitOps for MockGit {
    async fn remote_by_partial_url(&self, _partial_url: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().remote.clone())
    }

    async fn branch_sha(&self, branch: &str, remote: Option<&str>) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let exists = match remote {
            Some(_) => state.remote_branches.contains(branch),
            None => state.branches.contains(branch),
        };
        Ok(exists.then(|| format!("sha-{}", branch)))
    }

    async fn tag_sha(&self, tag: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.tags.contains(tag).then(|| format!("sha-{}", tag)))
    }

    async fn is_branch_up_to_date(&self, _branch: &str, _remote: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().up_to_date)
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.current_branch_name())
    }

    async fn create_branch(&self, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.branches.insert(branch.to_string()) {
            return Err(GitError::BranchExists(branch.to_string()).into());
        }
        state.current_branch = branch.to_string();
        Ok(())
    }

    async fn switch_branch(&self, branch: &str) -> Result<()> {
        self.state.lock().unwrap().current_branch = branch.to_string();
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.state.lock().unwrap().branches.remove(branch);
        Ok(())
    }

    async fn add_all(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.state.lock().unwrap().commits.push(message.to_string());
        Ok(())
    }

    async fn create_tag(&self, tag: &str) -> Result<()> {
        self.state.lock().unwrap().tags.insert(tag.to_string());
        Ok(())
    }

    async fn delete_tag(&self, tag: &str) -> Result<()> {
        self.state.lock().unwrap().tags.remove(tag);
        Ok(())
    }

    async fn push_tag(&self, _tag: &str, _remote: &str) -> Result<()> {
        Ok(())
    }

    async fn status(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().status.clone())
    }

    async fn merge_base(&self, a: &str, _b: &str) -> Result<String> {
        Ok(format!("sha-{}", a))
    }

    async fn rev_list(&self, _commit: &str, _branch: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn merge_or_abort(&self, _commit: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Policy checker with a fixed outcome
pub struct MockPolicyCheck {
    pub clean: bool,
}

#[async_trait]
impl PolicyCheck for MockPolicyCheck {
    async fn run_fix(&self) -> Result<bool> {
        Ok(self.clean)
    }
}

/// Package manager that edits manifests directly
#[derive(Default)]
pub struct MockPackageManager {
    pub installs: Mutex<Vec<PathBuf>>,
    pub scripts: Mutex<Vec<(String, String)>>,
    pub fail_install: bool,
}

#[async_trait]
impl PackageManager for MockPackageManager {
    async fn install(&self, directories: &[PathBuf]) -> Result<bool> {
        self.installs
            .lock()
            .unwrap()
            .extend(directories.iter().cloned());
        Ok(!self.fail_install)
    }

    async fn set_version(&self, package: &Package, version: &str) -> Result<()> {
        update_manifest(&package.manifest_path(), |manifest| {
            manifest["version"] = serde_json::Value::String(version.to_string());
        })
    }

    async fn run_script(&self, package: &Package, script: &str) -> Result<()> {
        self.scripts
            .lock()
            .unwrap()
            .push((package.name.clone(), script.to_string()));
        Ok(())
    }
}

/// Manifest writer updating ranges in place
pub struct MockManifestWriter;

#[async_trait]
impl ManifestWriter for MockManifestWriter {
    async fn save_package(&self, package: &Package) -> Result<()> {
        update_manifest(&package.manifest_path(), |manifest| {
            manifest["version"] = serde_json::Value::String(package.version.clone());
            for dep in &package.dependencies {
                let section = if dep.dev {
                    "devDependencies"
                } else {
                    "dependencies"
                };
                manifest[section][dep.name.as_str()] =
                    serde_json::Value::String(dep.range.clone());
            }
        })
    }
}

/// Release context over a fixture with the given doubles
pub async fn release_context(
    fixture: &RepoFixture,
    git: Arc<MockGit>,
    registry: MockRegistry,
    pm: Arc<MockPackageManager>,
) -> ReleaseContext {
    release_context_with_policy(fixture, git, registry, pm, true).await
}

/// Release context whose policy check reports `clean`
pub async fn release_context_with_policy(
    fixture: &RepoFixture,
    git: Arc<MockGit>,
    registry: MockRegistry,
    pm: Arc<MockPackageManager>,
    clean: bool,
) -> ReleaseContext {
    ReleaseContext::new(
        fixture.context(),
        fixture.config(),
        Collaborators {
            git,
            registry: Arc::new(registry),
            package_manager: pm,
            manifests: Arc::new(MockManifestWriter),
            policy: Arc::new(MockPolicyCheck { clean }),
        },
    )
    .await
    .unwrap()
}
