//! SemVer version scheme

use crate::error::Result;
use crate::types::BumpType;

use super::{VersionScheme, VersionSchemeKind};

/// Semantic Versioning scheme
///
/// Bumping clears prerelease and build metadata. A prerelease whose lower
/// fields are already zero is released as is instead of incremented.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverScheme;

impl VersionScheme for SemverScheme {
    fn kind(&self) -> VersionSchemeKind {
        VersionSchemeKind::Semver
    }

    fn bump(&self, current: &semver::Version, bump: BumpType) -> Result<semver::Version> {
        let pre = !current.pre.is_empty();
        let next = match bump {
            BumpType::Major if pre && current.minor == 0 && current.patch == 0 => {
                semver::Version::new(current.major, 0, 0)
            }
            BumpType::Major => semver::Version::new(current.major + 1, 0, 0),
            BumpType::Minor if pre && current.patch == 0 => {
                semver::Version::new(current.major, current.minor, 0)
            }
            BumpType::Minor => semver::Version::new(current.major, current.minor + 1, 0),
            BumpType::Patch if pre => {
                semver::Version::new(current.major, current.minor, current.patch)
            }
            BumpType::Patch => {
                semver::Version::new(current.major, current.minor, current.patch + 1)
            }
            BumpType::Current => current.clone(),
        };
        Ok(next)
    }
}
