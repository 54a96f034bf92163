//! Repository model
//!
//! Packages are grouped into release groups that share one version, or stand
//! alone as independent packages. [`Context`] holds the full package map and
//! the release groups derived from configuration.

mod context;
mod kind;
mod package;

pub use context::{Context, MonoRepo};
pub use kind::{short_package_name, Identity, MonoRepoKind};
pub use package::{DependencyEdge, Package, MANIFEST_FILE};
