//! Start a new release cycle on a main branch

use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::error::{Result, WorkflowError};
use crate::monorepo::Identity;
use crate::scheme::parse_version;
use crate::types::{BumpRequest, BumpType, VersionChange};

use super::{
    bump_dependencies, bump_version, check_prerelease_dependencies, BumpOptions,
    DependencyBumpOptions, ReleaseContext,
};

/// Result of [`create_release_bump`]
#[derive(Debug, Clone)]
pub struct ReleaseBumpResult {
    /// Working branch holding the bump commit
    pub branch: String,
    /// Release line branch to create once the bump merges
    pub release_branch: String,
    /// Version changes in the bump commit
    pub changes: Vec<VersionChange>,
    /// Follow-up steps for the operator
    pub instructions: String,
}

/// Bump `target` and every identity still tracking its local version, and
/// point dependents at the new in-development versions.
///
/// The release line for the current version, `release/<major>.<minor>`, must
/// not exist yet; the returned instructions describe creating it.
#[instrument(skip(rc), fields(target = %target, bump = %bump))]
pub async fn create_release_bump(
    rc: &mut ReleaseContext,
    target: &Identity,
    bump: BumpType,
) -> Result<ReleaseBumpResult> {
    rc.check_policy().await?;

    if bump == BumpType::Current {
        return Err(WorkflowError::UnsupportedBumpType {
            bump: bump.to_string(),
            operation: "release bump".to_string(),
        }
        .into());
    }
    let branch = rc.original_branch().to_string();
    let main_branches = rc.config.repo.main_branches.clone();
    if !main_branches.contains(&branch) {
        return Err(WorkflowError::NotMainBranch {
            branch,
            allowed: main_branches.join(", "),
        }
        .into());
    }

    let remote = rc.ensure_up_to_date(&branch).await?;

    let prerelease = check_prerelease_dependencies(rc).await?;
    if !prerelease.is_empty() {
        let list: Vec<String> = prerelease.iter().map(|p| format!("  {}", p)).collect();
        return Err(WorkflowError::PrereleaseDependencies(list.join("\n")).into());
    }

    let bag = rc.collect_version_info(target).await?;

    let current = rc
        .repo
        .version_of(target)
        .ok_or_else(|| WorkflowError::UnknownTarget(target.to_string()))?
        .to_string();
    let parsed = parse_version(&current)?;
    let release_branch = format!(
        "{}{}.{}",
        rc.config.repo.release_branch_prefix, parsed.major, parsed.minor
    );
    if rc.git().branch_sha(&release_branch, None).await?.is_some()
        || rc.git().branch_sha(&release_branch, Some(&remote)).await?.is_some()
    {
        return Err(WorkflowError::ReleaseBranchExists(release_branch).into());
    }

    let work_branch = format!("{}_bump_{}_{}", bump, target.short_name(), current);
    rc.create_branch(&work_branch).await?;
    rc.install(None).await?;

    let to_bump: Vec<Identity> = bag
        .entries()
        .filter(|(identity, _)| bag.need_bump(identity))
        .map(|(identity, _)| identity.clone())
        .collect();

    let mut changes = Vec::new();
    let mut bumps = BTreeMap::new();
    for identity in &to_bump {
        let result =
            bump_version(rc, identity, &BumpRequest::Bump(bump), &BumpOptions::step()).await?;
        bumps.insert(identity.clone(), Some(result.version.clone()));
        changes.extend(result.changes);
    }

    let options = DependencyBumpOptions {
        prerelease: true,
        ..Default::default()
    };
    bump_dependencies(rc, &bumps, &options).await?;

    let mut message = format!("[bump] {} ({})\n\n", target, bump);
    for change in &changes {
        message.push_str(&format!("{}\n", change));
    }
    rc.commit(&message).await?;

    let instructions = format!(
        "Open a pull request for '{work}' into '{base}'. After it merges, create \
         '{release}' from the commit just before the merge and push it to {remote}.",
        work = work_branch,
        base = branch,
        release = release_branch,
        remote = remote,
    );
    info!(branch = %work_branch, release_branch = %release_branch, bumped = to_bump.len(), "release bump ready");

    Ok(ReleaseBumpResult {
        branch: work_branch,
        release_branch,
        changes,
        instructions,
    })
}
