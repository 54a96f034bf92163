//! Version bump workflow

use tracing::{debug, info, instrument};

use crate::error::{Result, WorkflowError};
use crate::monorepo::Identity;
use crate::scheme::adjust_version;
use crate::types::{BumpRequest, VersionChange};

use super::ReleaseContext;

/// Options for [`bump_version`]
#[derive(Debug, Clone)]
pub struct BumpOptions {
    /// Install dependencies before bumping
    pub install: bool,
    /// Commit the result
    pub commit: bool,
}

impl Default for BumpOptions {
    fn default() -> Self {
        Self {
            install: true,
            commit: true,
        }
    }
}

impl BumpOptions {
    /// Bump without installing or committing, as a step of a larger workflow
    pub fn step() -> Self {
        Self {
            install: false,
            commit: false,
        }
    }
}

/// Result of a version bump
#[derive(Debug, Clone)]
pub struct BumpResult {
    /// Bumped identity
    pub identity: Identity,
    /// Version after the bump
    pub version: String,
    /// Every identity whose version changed
    pub changes: Vec<VersionChange>,
}

/// Bump the version of a release group or package.
///
/// Every member gets the new version through the package manager, the
/// version generation script runs where defined, and ranges between members
/// of a release group are moved to the new version.
#[instrument(skip(rc, options), fields(target = %target, request = %request))]
pub async fn bump_version(
    rc: &mut ReleaseContext,
    target: &Identity,
    request: &BumpRequest,
    options: &BumpOptions,
) -> Result<BumpResult> {
    let before = rc.collect_versions(false)?;

    if options.install {
        rc.install(Some(target)).await?;
    }

    let current = rc
        .repo
        .version_of(target)
        .ok_or_else(|| WorkflowError::UnknownTarget(target.to_string()))?
        .to_string();
    let scheme = rc.scheme_for(target);
    let version = adjust_version(&current, request, scheme)?;
    info!(current = %current, version = %version, scheme = %scheme, "bumping version");

    let members: Vec<_> = rc.repo.members(target).into_iter().cloned().collect();
    let genver = rc.config.versioning.genver_script.clone();
    for member in &members {
        rc.package_manager().set_version(member, &version).await?;
        if member.has_script(&genver) {
            debug!(package = %member.name, script = %genver, "running version generation");
            rc.package_manager().run_script(member, &genver).await?;
        }
    }

    rc.repo.reload()?;

    if let Identity::ReleaseGroup(_) = target {
        let sibling_range = format!("^{}", version);
        let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
        for name in &names {
            let Some(pkg) = rc.repo.package_mut(name) else {
                continue;
            };
            let mut changed = false;
            for sibling in &names {
                changed |= pkg.set_dependency_range(sibling, &sibling_range);
            }
            if changed {
                let pkg = pkg.clone();
                rc.manifests().save_package(&pkg).await?;
            }
        }
    }

    let after = rc.repo.collect_versions()?;
    let changes = before.diff(&after);

    if options.commit && !changes.is_empty() {
        rc.commit(&commit_message(target, &version, &changes)).await?;
    }

    Ok(BumpResult {
        identity: target.clone(),
        version,
        changes,
    })
}

/// Commit message listing every version change
pub fn commit_message(target: &Identity, version: &str, changes: &[VersionChange]) -> String {
    let mut message = format!("Bump {} to {}\n", target, version);
    if !changes.is_empty() {
        message.push('\n');
        for change in changes {
            message.push_str(&format!("{}\n", change));
        }
    }
    message
}
