//! Version scheme traits

use crate::error::Result;
use crate::types::BumpType;

use super::VersionSchemeKind;

/// Arithmetic for one version scheme
pub trait VersionScheme: Send + Sync {
    /// Scheme tag
    fn kind(&self) -> VersionSchemeKind;

    /// Apply a relative bump to a parsed version
    fn bump(&self, current: &semver::Version, bump: BumpType) -> Result<semver::Version>;
}
