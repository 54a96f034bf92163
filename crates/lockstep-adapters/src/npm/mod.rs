//! npm adapters

mod manifest;
mod package_manager;
mod registry;

pub use manifest::{PackageJson, PackageJsonWriter};
pub use package_manager::NpmPackageManager;
pub use registry::NpmRegistry;
