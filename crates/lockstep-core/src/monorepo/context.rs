//! Repository context: packages and release groups

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use glob::glob;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bag::VersionBag;
use crate::config::RepoLayout;
use crate::error::{ConfigError, Result, VersionError, WorkflowError};

use super::{Identity, MonoRepoKind, Package, MANIFEST_FILE};

/// A release group: packages versioned in lockstep
#[derive(Debug, Clone, Serialize)]
pub struct MonoRepo {
    /// Release group kind
    pub kind: MonoRepoKind,
    /// Shared version of every member
    pub version: String,
    /// Group root
    pub repo_path: PathBuf,
    /// Member package names
    pub packages: Vec<String>,
}

/// Loaded repository state
#[derive(Debug, Clone)]
pub struct Context {
    root: PathBuf,
    layout: RepoLayout,
    /// All packages by name
    pub packages: BTreeMap<String, Package>,
    /// Release groups by kind
    pub release_groups: BTreeMap<MonoRepoKind, MonoRepo>,
}

impl Context {
    /// Scan the repository at `root` using `layout`
    pub fn load(root: &Path, layout: &RepoLayout) -> Result<Self> {
        info!(root = %root.display(), "loading repository");
        let mut ctx = Self {
            root: root.to_path_buf(),
            layout: layout.clone(),
            packages: BTreeMap::new(),
            release_groups: BTreeMap::new(),
        };
        ctx.scan()?;
        Ok(ctx)
    }

    /// Re-read every manifest with the same root and layout
    pub fn reload(&mut self) -> Result<()> {
        debug!(root = %self.root.display(), "reloading repository");
        self.scan()
    }

    fn scan(&mut self) -> Result<()> {
        let mut packages = BTreeMap::new();
        let mut release_groups = BTreeMap::new();
        let mut seen_dirs = HashSet::new();

        for group in &self.layout.release_groups {
            let repo_path = self.root.join(&group.directory);
            let mut members = Vec::new();
            for pattern in &group.packages {
                for dir in package_dirs(&repo_path, pattern)? {
                    if !seen_dirs.insert(dir.clone()) {
                        continue;
                    }
                    let pkg = Package::load(&dir, Some(group.kind.clone()), None)?;
                    members.push(pkg.name.clone());
                    insert_package(&mut packages, pkg)?;
                }
            }

            let Some(first) = members.first() else {
                warn!(kind = %group.kind, "release group has no packages");
                continue;
            };
            let version = packages[first].version.clone();
            for name in &members {
                let member = &packages[name];
                if member.version != version {
                    return Err(VersionError::Conflict {
                        name: format!("{} ({} vs {})", group.kind, first, name),
                        existing: version,
                        new: member.version.clone(),
                    }
                    .into());
                }
            }

            debug!(kind = %group.kind, version = %version, members = members.len(), "release group");
            release_groups.insert(
                group.kind.clone(),
                MonoRepo {
                    kind: group.kind.clone(),
                    version,
                    repo_path,
                    packages: members,
                },
            );
        }

        for config in &self.layout.packages {
            for dir in package_dirs(&self.root, &config.pattern)? {
                if !seen_dirs.insert(dir.clone()) {
                    continue;
                }
                let pkg = Package::load(&dir, None, config.group.clone())?;
                insert_package(&mut packages, pkg)?;
            }
        }

        info!(
            packages = packages.len(),
            release_groups = release_groups.len(),
            "repository loaded"
        );
        self.packages = packages;
        self.release_groups = release_groups;
        Ok(())
    }

    /// Repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout the context was loaded with
    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Package by name
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Mutable package by name
    pub fn package_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.get_mut(name)
    }

    /// Release group by kind
    pub fn release_group(&self, kind: &MonoRepoKind) -> Option<&MonoRepo> {
        self.release_groups.get(kind)
    }

    /// Packages of one release group
    pub fn packages_in_release_group(&self, kind: &MonoRepoKind) -> Vec<&Package> {
        self.packages
            .values()
            .filter(|p| p.release_group.as_ref() == Some(kind))
            .collect()
    }

    /// Packages outside every release group
    pub fn independent_packages(&self) -> Vec<&Package> {
        self.packages
            .values()
            .filter(|p| p.release_group.is_none())
            .collect()
    }

    /// Packages sharing `identity`
    pub fn members(&self, identity: &Identity) -> Vec<&Package> {
        match identity {
            Identity::ReleaseGroup(kind) => self.packages_in_release_group(kind),
            Identity::Package(name) => self.package(name).into_iter().collect(),
        }
    }

    /// Current version of `identity`
    pub fn version_of(&self, identity: &Identity) -> Option<&str> {
        match identity {
            Identity::ReleaseGroup(kind) => self.release_group(kind).map(|g| g.version.as_str()),
            Identity::Package(name) => self.package(name).map(|p| p.version.as_str()),
        }
    }

    /// Resolve a command-line target: release group kind first, then package name
    pub fn resolve_target(&self, target: &str) -> Result<Identity> {
        let kind = MonoRepoKind::new(target);
        if self.release_groups.contains_key(&kind) {
            return Ok(Identity::ReleaseGroup(kind));
        }
        match self.package(target) {
            Some(pkg) => Ok(pkg.identity()),
            None => Err(WorkflowError::UnknownTarget(target.to_string()).into()),
        }
    }

    /// Current versions of every releasable identity.
    ///
    /// Private packages outside a release group are never published and are
    /// left out.
    pub fn collect_versions(&self) -> Result<VersionBag> {
        let mut bag = VersionBag::new();
        for pkg in self.packages.values() {
            if pkg.private && pkg.release_group.is_none() {
                continue;
            }
            bag.add_package(pkg)?;
        }
        debug!(entries = bag.len(), "collected versions");
        Ok(bag)
    }
}

fn insert_package(packages: &mut BTreeMap<String, Package>, pkg: Package) -> Result<()> {
    if let Some(existing) = packages.get(&pkg.name) {
        return Err(ConfigError::InvalidValue {
            field: "packages".to_string(),
            message: format!(
                "package '{}' found at both {} and {}",
                pkg.name,
                existing.directory.display(),
                pkg.directory.display()
            ),
        }
        .into());
    }
    packages.insert(pkg.name.clone(), pkg);
    Ok(())
}

fn package_dirs(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = if pattern == "." {
        base.to_string_lossy().to_string()
    } else {
        base.join(pattern).to_string_lossy().to_string()
    };

    let invalid = |message: String| ConfigError::InvalidValue {
        field: "packages".to_string(),
        message,
    };

    let mut dirs = Vec::new();
    for entry in glob(&full_pattern).map_err(|e| invalid(e.to_string()))? {
        let path = entry.map_err(|e| invalid(e.to_string()))?;
        if path.is_dir() && path.join(MANIFEST_FILE).exists() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}
