//! Release workflows
//!
//! Each workflow runs a fixed sequence of fail-fast steps against a
//! [`ReleaseContext`]. Steps that touch git record what they create so the
//! caller can roll back with [`ReleaseContext::clean_up`].

mod bump;
mod context;
mod dependencies;
mod release;
mod release_bump;

pub use bump::{bump_version, commit_message, BumpOptions, BumpResult};
pub use context::{Collaborators, ReleaseContext};
pub use dependencies::{
    bump_dependencies, check_prerelease_dependencies, release_prerelease_dependencies,
    DependencyBumpOptions, PrereleaseDependency,
};
pub use release::{push_publish_tags, release_version, PendingPublish, ReleaseOutcome};
pub use release_bump::{create_release_bump, ReleaseBumpResult};
