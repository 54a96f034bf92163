//! Release group kinds and lockstep identities

use serde::{Deserialize, Serialize};

use super::Package;

/// Release group kind.
///
/// Well-known kinds have constructors; configuration may declare any other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonoRepoKind(String);

impl MonoRepoKind {
    /// Create a kind from its name
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Client release group
    pub fn client() -> Self {
        Self::new("client")
    }

    /// Server release group
    pub fn server() -> Self {
        Self::new("server")
    }

    /// Azure release group
    pub fn azure() -> Self {
        Self::new("azure")
    }

    /// Build tools release group
    pub fn build_tools() -> Self {
        Self::new("build-tools")
    }

    /// Kind name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MonoRepoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MonoRepoKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// Key under which a package's version is tracked.
///
/// Packages in a release group share their group's identity, everything else
/// is tracked by package name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identity {
    /// Independently versioned package
    Package(String),
    /// Release group
    ReleaseGroup(MonoRepoKind),
}

impl Identity {
    /// Identity of a package
    pub fn of(package: &Package) -> Self {
        match &package.release_group {
            Some(kind) => Self::ReleaseGroup(kind.clone()),
            None => Self::Package(package.name.clone()),
        }
    }

    /// Name used in messages and publish tags.
    ///
    /// Release groups use their kind. Packages drop their npm scope, so
    /// `@scope/name` becomes `name`.
    pub fn short_name(&self) -> &str {
        match self {
            Self::ReleaseGroup(kind) => kind.as_str(),
            Self::Package(name) => short_package_name(name),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package(name) => f.write_str(name),
            Self::ReleaseGroup(kind) => write!(f, "{}", kind),
        }
    }
}

/// Package name without its npm scope
pub fn short_package_name(name: &str) -> &str {
    match name.strip_prefix('@') {
        Some(scoped) => scoped.split_once('/').map_or(name, |(_, short)| short),
        None => name,
    }
}
