//! Internal release scheme

use crate::error::{Result, VersionError};
use crate::types::BumpType;

use super::{VersionScheme, VersionSchemeKind};

/// Internal release scheme. Versions are assigned by a separate process, so
/// no arithmetic is defined here.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalScheme;

impl VersionScheme for InternalScheme {
    fn kind(&self) -> VersionSchemeKind {
        VersionSchemeKind::Internal
    }

    fn bump(&self, _current: &semver::Version, _bump: BumpType) -> Result<semver::Version> {
        Err(VersionError::SchemeUnsupported(self.kind().to_string()).into())
    }
}
