//! Version bags
//!
//! [`VersionBag`] tracks one version per lockstep identity and rejects
//! conflicting additions. [`ReferenceVersionBag`] adds provenance so a
//! dependency walk can reconcile local and published versions.

mod reference;
mod version;

pub use reference::{Reference, ReferenceVersionBag};
pub use version::{AddMode, VersionBag};
