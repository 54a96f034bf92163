//! Virtual patch version scheme
//!
//! Pre-1.0 packages encode "major" changes in the minor field and "minor"
//! changes in thousands of the patch field, so `0.2.1150` reads as
//! virtual `2.1.150`.

use crate::error::{Result, VersionError};
use crate::types::BumpType;

use super::{VersionScheme, VersionSchemeKind};

/// Patch value a virtual major bump resets to
pub const VIRTUAL_PATCH_BASE: u64 = 1000;

/// Virtual patch scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualPatchScheme;

impl VersionScheme for VirtualPatchScheme {
    fn kind(&self) -> VersionSchemeKind {
        VersionSchemeKind::VirtualPatch
    }

    fn bump(&self, current: &semver::Version, bump: BumpType) -> Result<semver::Version> {
        if current.major != 0 {
            return Err(VersionError::VirtualPatchMajor {
                version: current.to_string(),
                major: current.major,
            }
            .into());
        }

        let next = match bump {
            BumpType::Major => semver::Version::new(0, current.minor + 1, VIRTUAL_PATCH_BASE),
            BumpType::Minor => {
                semver::Version::new(0, current.minor, current.patch + VIRTUAL_PATCH_BASE)
            }
            BumpType::Patch => semver::Version::new(0, current.minor, current.patch + 1),
            BumpType::Current => {
                return Err(VersionError::InvalidBumpType {
                    bump: bump.to_string(),
                    scheme: self.kind().to_string(),
                }
                .into())
            }
        };
        Ok(next)
    }
}
