//! Release handshake for patch releases off a release branch

use tracing::{info, instrument};

use crate::error::{Result, WorkflowError};
use crate::monorepo::Identity;
use crate::scheme::adjust_version;
use crate::types::{BumpRequest, BumpType, VersionChange};

use super::{bump_version, release_prerelease_dependencies, BumpOptions, ReleaseContext};

/// A version whose publish tag does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPublish {
    /// Identity waiting for publication
    pub identity: Identity,
    /// Version to publish
    pub version: String,
    /// Tag the publish pipeline creates
    pub tag: String,
}

/// Outcome of [`release_version`]
#[derive(Debug, Clone)]
pub enum ReleaseOutcome {
    /// Some versions still need to be published. Nothing was changed.
    AwaitingPublish(Vec<PendingPublish>),
    /// Everything is published; a branch with the next patch versions is ready
    Released {
        /// Branch holding the bump commit
        branch: String,
        /// Versions that were released
        released: Vec<(Identity, String)>,
        /// Version changes in the bump commit
        changes: Vec<VersionChange>,
    },
}

/// Run the release handshake for `target`.
///
/// The first run reports the versions that still need publishing. Once every
/// publish tag exists, the next run moves the released identities to their
/// next patch version on a new branch.
#[instrument(skip(rc), fields(target = %target, bump = %bump))]
pub async fn release_version(
    rc: &mut ReleaseContext,
    target: &Identity,
    bump: BumpType,
) -> Result<ReleaseOutcome> {
    rc.check_policy().await?;

    if bump != BumpType::Patch {
        return Err(WorkflowError::UnsupportedBumpType {
            bump: bump.to_string(),
            operation: "release".to_string(),
        }
        .into());
    }
    let branch = rc.original_branch().to_string();
    let prefix = rc.config.repo.release_branch_prefix.clone();
    if !branch.starts_with(&prefix) {
        return Err(WorkflowError::NotReleaseBranch { branch, prefix }.into());
    }

    rc.ensure_up_to_date(&branch).await?;

    let bag = rc.collect_version_info(target).await?;
    let to_release: Vec<(Identity, String)> = bag
        .entries()
        .filter(|(identity, _)| bag.need_release(identity))
        .map(|(identity, reference)| (identity.clone(), reference.version.clone()))
        .collect();
    if to_release.is_empty() {
        return Err(WorkflowError::NothingToRelease(target.to_string()).into());
    }

    let mut pending = Vec::new();
    for (identity, version) in &to_release {
        let tag = rc.publish_tag(identity, version);
        if rc.git().tag_sha(&tag).await?.is_none() {
            pending.push(PendingPublish {
                identity: identity.clone(),
                version: version.clone(),
                tag,
            });
        }
    }
    if !pending.is_empty() {
        for p in &pending {
            info!(identity = %p.identity, version = %p.version, tag = %p.tag, "awaiting publish");
        }
        return Ok(ReleaseOutcome::AwaitingPublish(pending));
    }

    let current = rc
        .repo
        .version_of(target)
        .ok_or_else(|| WorkflowError::UnknownTarget(target.to_string()))?
        .to_string();
    let next = adjust_version(&current, &BumpRequest::Bump(bump), rc.scheme_for(target))?;
    let work_branch = format!("patch_bump_{}_{}", target.short_name(), next);
    rc.create_branch(&work_branch).await?;

    release_prerelease_dependencies(rc, &to_release).await?;

    let mut changes = Vec::new();
    for (identity, _) in &to_release {
        let result = bump_version(rc, identity, &BumpRequest::Bump(bump), &BumpOptions::step()).await?;
        changes.extend(result.changes);
    }

    let mut message = format!("Bump {} to next patch version {}\n\n", target, next);
    for (identity, version) in &to_release {
        message.push_str(&format!("Released {}@{}\n", identity, version));
    }
    for change in &changes {
        message.push_str(&format!("{}\n", change));
    }
    rc.commit(&message).await?;

    info!(branch = %work_branch, released = to_release.len(), "release bump ready");
    Ok(ReleaseOutcome::Released {
        branch: work_branch,
        released: to_release,
        changes,
    })
}

/// Create and push the publish tags of versions awaiting publication.
///
/// Pushing a tag is what triggers the external publish pipeline. Returns the
/// pushed tags.
#[instrument(skip_all, fields(count = pending.len()))]
pub async fn push_publish_tags(
    rc: &mut ReleaseContext,
    pending: &[PendingPublish],
) -> Result<Vec<String>> {
    let remote = rc.remote().await?;
    let mut pushed = Vec::new();
    for p in pending {
        rc.create_tag(&p.tag).await?;
        rc.git().push_tag(&p.tag, &remote).await?;
        info!(tag = %p.tag, remote = %remote, "pushed publish tag");
        pushed.push(p.tag.clone());
    }
    Ok(pushed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LockstepError;
    use crate::monorepo::MonoRepoKind;
    use crate::testing::{
        release_context, release_context_with_policy, MockGit, MockPackageManager, MockRegistry,
        RepoFixture,
    };

    fn client() -> Identity {
        Identity::ReleaseGroup(MonoRepoKind::client())
    }

    fn fixture() -> RepoFixture {
        RepoFixture::new()
            .group_package("client", "app", "1.2.0", &[("lib", "^1.2.0")], &[])
            .group_package("client", "lib", "1.2.0", &[], &[])
            .group_package("server", "srv", "3.0.0", &[("app", "^1.2.0-0")], &[])
    }

    #[tokio::test]
    async fn test_blocked_release_changes_nothing() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("release/1.2"));
        let mut rc = release_context(
            &fixture,
            git.clone(),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let outcome = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap();

        let ReleaseOutcome::AwaitingPublish(pending) = outcome else {
            panic!("expected AwaitingPublish, got {:?}", outcome);
        };
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tag, "client_v1.2.0");

        assert_eq!(git.current_branch_name(), "release/1.2");
        assert!(git.commits().is_empty());
        assert!(rc.new_branches().is_empty());
        rc.repo.reload().unwrap();
        assert_eq!(rc.repo.package("app").unwrap().version, "1.2.0");
    }

    #[tokio::test]
    async fn test_release_after_publish() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("release/1.2").with_tags(&["client_v1.2.0"]));
        let mut rc = release_context(
            &fixture,
            git.clone(),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let outcome = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap();

        let ReleaseOutcome::Released {
            branch, changes, ..
        } = outcome
        else {
            panic!("expected Released, got {:?}", outcome);
        };
        assert_eq!(branch, "patch_bump_client_1.2.1");
        assert_eq!(git.current_branch_name(), branch);
        assert_eq!(changes[0].to_string(), "client: 1.2.0 -> 1.2.1");

        assert_eq!(rc.repo.package("lib").unwrap().version, "1.2.1");
        assert_eq!(
            rc.repo.package("app").unwrap().dependency("lib").unwrap().range,
            "^1.2.1"
        );
        // released prerelease pin became a plain range
        assert_eq!(
            rc.repo.package("srv").unwrap().dependency("app").unwrap().range,
            "^1.2.0"
        );
        assert_eq!(git.commits().len(), 1);
    }

    #[tokio::test]
    async fn test_push_publish_tags_then_release() {
        let fixture = fixture();
        let git = Arc::new(MockGit::on_branch("release/1.2"));
        let mut rc = release_context(
            &fixture,
            git.clone(),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let ReleaseOutcome::AwaitingPublish(pending) =
            release_version(&mut rc, &client(), BumpType::Patch)
                .await
                .unwrap()
        else {
            panic!("expected AwaitingPublish");
        };
        let pushed = push_publish_tags(&mut rc, &pending).await.unwrap();
        assert_eq!(pushed, vec!["client_v1.2.0".to_string()]);
        assert!(git.tags().contains("client_v1.2.0"));
        assert_eq!(rc.new_tags(), ["client_v1.2.0".to_string()]);

        let outcome = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap();
        assert!(matches!(outcome, ReleaseOutcome::Released { .. }));
    }

    #[tokio::test]
    async fn test_release_requires_release_branch() {
        let fixture = fixture();
        let mut rc = release_context(
            &fixture,
            Arc::new(MockGit::on_branch("main")),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let err = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockstepError::Workflow(WorkflowError::NotReleaseBranch { .. })
        ));

        let err = release_version(&mut rc, &client(), BumpType::Minor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockstepError::Workflow(WorkflowError::UnsupportedBumpType { .. })
        ));
    }

    #[tokio::test]
    async fn test_release_rejects_stale_branch() {
        let fixture = fixture();
        let mut rc = release_context(
            &fixture,
            Arc::new(MockGit::on_branch("release/1.2").stale()),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
        )
        .await;

        let err = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("release/1.2"));
    }

    #[tokio::test]
    async fn test_release_blocked_by_policy_check() {
        let fixture = fixture();
        let mut rc = release_context_with_policy(
            &fixture,
            Arc::new(MockGit::on_branch("release/1.2")),
            MockRegistry::new(),
            Arc::new(MockPackageManager::default()),
            false,
        )
        .await;

        let err = release_version(&mut rc, &client(), BumpType::Patch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockstepError::Workflow(WorkflowError::PolicyCheckDirty(_))
        ));
    }
}
