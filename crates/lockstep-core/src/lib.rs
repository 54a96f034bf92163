//! Lockstep Core - version resolution and release orchestration
//!
//! This crate provides the repository model, version scheme arithmetic,
//! dependency reconciliation and the release workflows for monorepos whose
//! packages are versioned in lockstep release groups.

pub mod bag;
pub mod collab;
pub mod config;
pub mod error;
pub mod monorepo;
pub mod range;
pub mod reconcile;
pub mod scheme;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use bag::{AddMode, Reference, ReferenceVersionBag, VersionBag};
pub use collab::{GitOps, ManifestWriter, PackageManager, PolicyCheck, Registry};
pub use config::Config;
pub use error::{LockstepError, Result};
pub use monorepo::{Context, Identity, MonoRepo, MonoRepoKind, Package};
pub use reconcile::{collect_version_info, ReconcileOptions};
pub use scheme::{adjust_version, VersionSchemeKind};
pub use types::{BumpRequest, BumpType, VersionChange};
pub use workflow::{Collaborators, ReleaseContext};
