//! Version scheme arithmetic
//!
//! Translates a bump request into a concrete target version under one of the
//! supported version schemes.

mod internal;
mod registry;
mod semver;
mod traits;
mod virtual_patch;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VersionError};
use crate::types::BumpRequest;

pub use self::internal::InternalScheme;
pub use self::registry::SchemeRegistry;
pub use self::semver::SemverScheme;
pub use self::traits::VersionScheme;
pub use self::virtual_patch::{VirtualPatchScheme, VIRTUAL_PATCH_BASE};

/// Version scheme tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionSchemeKind {
    /// Standard semantic versioning
    #[default]
    Semver,
    /// Pre-1.0 scheme encoding major/minor changes in the patch field
    VirtualPatch,
    /// Internal release scheme; no arithmetic is defined for it
    Internal,
}

impl VersionSchemeKind {
    /// Returns the string representation of the scheme
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semver => "semver",
            Self::VirtualPatch => "virtualPatch",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for VersionSchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VersionSchemeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "semver" => Ok(Self::Semver),
            "virtualPatch" | "virtual-patch" => Ok(Self::VirtualPatch),
            "internal" => Ok(Self::Internal),
            _ => Err(format!("Unknown version scheme: {}", s)),
        }
    }
}

/// Compute the next version for `current` under `scheme`.
///
/// Explicit versions are returned verbatim under `semver` and rejected by
/// every other scheme. `internal` has no arithmetic at all.
pub fn adjust_version(
    current: &str,
    request: &BumpRequest,
    scheme: VersionSchemeKind,
) -> Result<String> {
    let parsed = parse_version(current)?;
    let strategy = SchemeRegistry::new()
        .get(scheme)
        .ok_or_else(|| VersionError::SchemeUnsupported(scheme.to_string()))?;

    let next = match request {
        BumpRequest::Exact(version) if scheme == VersionSchemeKind::Semver => version.clone(),
        BumpRequest::Exact(_) if scheme == VersionSchemeKind::Internal => {
            return Err(VersionError::SchemeUnsupported(scheme.to_string()).into())
        }
        BumpRequest::Exact(_) => {
            if scheme == VersionSchemeKind::VirtualPatch && parsed.major != 0 {
                return Err(VersionError::VirtualPatchMajor {
                    version: parsed.to_string(),
                    major: parsed.major,
                }
                .into());
            }
            return Err(VersionError::InvalidBumpType {
                bump: request.to_string(),
                scheme: scheme.to_string(),
            }
            .into());
        }
        BumpRequest::Bump(bump) => strategy.bump(&parsed, *bump)?,
    };

    let next = next.to_string();
    debug!(current, next = %next, request = %request, scheme = %scheme, "adjusted version");
    Ok(next)
}

/// Guess the scheme a version is using.
///
/// `0.x.y` versions with a patch at or above the virtual patch base are
/// virtual patch versions; everything else is treated as semver.
pub fn detect_scheme(version: &str) -> VersionSchemeKind {
    match ::semver::Version::parse(version) {
        Ok(v) if v.major == 0 && v.patch >= VIRTUAL_PATCH_BASE => VersionSchemeKind::VirtualPatch,
        _ => VersionSchemeKind::Semver,
    }
}

/// Build the dependency range used to point at `version`.
///
/// Prerelease ranges (`^1.2.0-0`) also accept in-development builds of that
/// version.
pub fn dev_range(version: &str, prerelease: bool) -> String {
    if prerelease {
        format!("^{}-0", version)
    } else {
        format!("^{}", version)
    }
}

pub(crate) fn parse_version(version: &str) -> Result<::semver::Version> {
    ::semver::Version::parse(version)
        .map_err(|e| VersionError::ParseFailed(version.to_string(), e.to_string()).into())
}
