//! Core types for Lockstep

use serde::{Deserialize, Serialize};

/// Kind of version bump being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    /// Major version bump (breaking changes)
    Major,
    /// Minor version bump (new features)
    Minor,
    /// Patch version bump (bug fixes)
    Patch,
    /// Keep the current version
    Current,
}

impl BumpType {
    /// Returns the string representation of the bump type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Current => "current",
        }
    }
}

impl std::fmt::Display for BumpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BumpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "current" => Ok(Self::Current),
            _ => Err(format!("Unknown bump type: {}", s)),
        }
    }
}

/// A bump request: either a relative bump or an explicit version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpRequest {
    /// Relative bump
    Bump(BumpType),
    /// Explicit target version, used verbatim
    Exact(semver::Version),
}

impl std::fmt::Display for BumpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bump(bump) => write!(f, "{}", bump),
            Self::Exact(version) => write!(f, "{}", version),
        }
    }
}

impl From<BumpType> for BumpRequest {
    fn from(bump: BumpType) -> Self {
        Self::Bump(bump)
    }
}

impl std::str::FromStr for BumpRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(bump) = s.parse::<BumpType>() {
            return Ok(Self::Bump(bump));
        }
        semver::Version::parse(s)
            .map(Self::Exact)
            .map_err(|e| format!("Not a bump type or version '{}': {}", s, e))
    }
}

/// A single version change applied to a lockstep identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
    /// Identity display name (release group kind or package name)
    pub name: String,
    /// Version before the change, if it was tracked
    pub previous: Option<String>,
    /// Version after the change
    pub current: String,
}

impl std::fmt::Display for VersionChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.previous {
            Some(previous) => write!(f, "{}: {} -> {}", self.name, previous, self.current),
            None => write!(f, "{}: {} (new)", self.name, self.current),
        }
    }
}
