//! Lockstep Adapters - npm collaborators for release workflows
//!
//! Production implementations of the collaborator traits in
//! `lockstep_core::collab`: `package.json` persistence, the npm registry
//! client, package manager commands and the policy check gate.

mod command;
pub mod npm;
pub mod policy;

pub use npm::{NpmPackageManager, NpmRegistry, PackageJson, PackageJsonWriter};
pub use policy::CommandPolicyCheck;
