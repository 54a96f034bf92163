//! Dependency range workflows
//!
//! Ranges inside a release group always track the group version exactly and
//! are rewritten by [`bump_version`](super::bump_version). The functions here
//! handle ranges that cross a release group boundary.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::error::{Result, WorkflowError};
use crate::monorepo::{Identity, MonoRepoKind};
use crate::range::NpmRange;
use crate::scheme::dev_range;

use super::ReleaseContext;

/// Options for [`bump_dependencies`]
#[derive(Debug, Clone, Default)]
pub struct DependencyBumpOptions {
    /// Only rewrite packages of this release group
    pub scope: Option<MonoRepoKind>,
    /// Write `^X-0` ranges that accept in-development versions
    pub prerelease: bool,
    /// Install after rewriting
    pub install: bool,
    /// Commit the rewrite on a new branch with this name
    pub branch: Option<String>,
}

/// A dependency range that still pins a prerelease of a released version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrereleaseDependency {
    /// Package declaring the dependency
    pub package: String,
    /// Dependency name
    pub dependency: String,
    /// Declared range
    pub range: String,
}

impl std::fmt::Display for PrereleaseDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}@{}", self.package, self.dependency, self.range)
    }
}

/// Point dependencies on the bumped identities at their target versions.
///
/// A `None` target uses the identity's current version. Packages sharing the
/// bumped identity are left alone. Returns the names of rewritten packages.
#[instrument(skip_all, fields(bumps = bumps.len(), prerelease = options.prerelease))]
pub async fn bump_dependencies(
    rc: &mut ReleaseContext,
    bumps: &BTreeMap<Identity, Option<String>>,
    options: &DependencyBumpOptions,
) -> Result<Vec<String>> {
    let mut targets = BTreeMap::new();
    for (identity, version) in bumps {
        let version = match version {
            Some(version) => version.clone(),
            None => rc
                .repo
                .version_of(identity)
                .ok_or_else(|| WorkflowError::UnknownTarget(identity.to_string()))?
                .to_string(),
        };
        targets.insert(identity.clone(), dev_range(&version, options.prerelease));
    }

    let mut changed = Vec::new();
    let names: Vec<String> = rc.repo.packages.keys().cloned().collect();
    for name in names {
        let Some(pkg) = rc.repo.package(&name) else {
            continue;
        };
        if let Some(scope) = &options.scope {
            if pkg.release_group.as_ref() != Some(scope) {
                continue;
            }
        }
        let own = pkg.identity();

        let mut rewrites = Vec::new();
        for dep in &pkg.dependencies {
            let Some(dep_identity) = rc.repo.package(&dep.name).map(|d| d.identity()) else {
                continue;
            };
            if dep_identity == own {
                continue;
            }
            if let Some(range) = targets.get(&dep_identity) {
                rewrites.push((dep.name.clone(), range.clone()));
            }
        }

        let Some(pkg) = rc.repo.package_mut(&name) else {
            continue;
        };
        let mut touched = false;
        for (dep, range) in &rewrites {
            if pkg.set_dependency_range(dep, range) {
                debug!(package = %name, dependency = %dep, range = %range, "rewrote range");
                touched = true;
            }
        }
        if touched {
            let pkg = pkg.clone();
            rc.manifests().save_package(&pkg).await?;
            changed.push(name);
        }
    }

    info!(packages = changed.len(), "updated dependency ranges");
    if changed.is_empty() {
        return Ok(changed);
    }

    rc.repo.reload()?;
    if options.install {
        rc.install(None).await?;
    }
    if let Some(branch) = &options.branch {
        rc.create_branch(branch).await?;
        let summary: Vec<String> = bumps.keys().map(ToString::to_string).collect();
        rc.commit(&format!(
            "Bump dependencies on {}\n\n{}\n",
            summary.join(", "),
            changed.join("\n")
        ))
        .await?;
    }

    Ok(changed)
}

/// Prerelease ranges on local packages whose base version is already released.
///
/// A version counts as released when its publish tag exists.
pub async fn check_prerelease_dependencies(
    rc: &ReleaseContext,
) -> Result<Vec<PrereleaseDependency>> {
    let mut found = Vec::new();
    for pkg in rc.repo.packages.values() {
        for dep in &pkg.dependencies {
            let Some(target) = rc.repo.package(&dep.name) else {
                continue;
            };
            let Ok(range) = NpmRange::parse(&dep.range) else {
                debug!(package = %pkg.name, dependency = %dep.name, range = %dep.range, "skipping unparsable range");
                continue;
            };
            let identity = target.identity();
            for base in range.prerelease_bases() {
                let tag = rc.publish_tag(&identity, &base.to_string());
                if rc.git().tag_sha(&tag).await?.is_some() {
                    found.push(PrereleaseDependency {
                        package: pkg.name.clone(),
                        dependency: dep.name.clone(),
                        range: dep.range.clone(),
                    });
                    break;
                }
            }
        }
    }
    Ok(found)
}

/// Replace `^X-0` pins on released versions with plain `^X`.
///
/// Returns the names of rewritten packages.
pub async fn release_prerelease_dependencies(
    rc: &mut ReleaseContext,
    released: &[(Identity, String)],
) -> Result<Vec<String>> {
    let pins: BTreeMap<&Identity, (String, String)> = released
        .iter()
        .map(|(identity, version)| {
            (identity, (dev_range(version, true), dev_range(version, false)))
        })
        .collect();

    let mut changed = Vec::new();
    let names: Vec<String> = rc.repo.packages.keys().cloned().collect();
    for name in names {
        let Some(pkg) = rc.repo.package(&name) else {
            continue;
        };
        let rewrites: Vec<(String, String)> = pkg
            .dependencies
            .iter()
            .filter_map(|dep| {
                let identity = rc.repo.package(&dep.name)?.identity();
                let (pin, released) = pins.get(&identity)?;
                (&dep.range == pin).then(|| (dep.name.clone(), released.clone()))
            })
            .collect();
        if rewrites.is_empty() {
            continue;
        }

        if let Some(pkg) = rc.repo.package_mut(&name) {
            for (dep, range) in &rewrites {
                pkg.set_dependency_range(dep, range);
            }
            let pkg = pkg.clone();
            rc.manifests().save_package(&pkg).await?;
            info!(package = %name, count = rewrites.len(), "released prerelease dependencies");
            changed.push(name);
        }
    }

    if !changed.is_empty() {
        rc.repo.reload()?;
    }
    Ok(changed)
}
