//! Conflict-detecting identity to version map

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, VersionError};
use crate::monorepo::{Identity, Package};
use crate::types::VersionChange;

/// How [`VersionBag::add`] treats an existing, different version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    /// A different version is a conflict
    #[default]
    Strict,
    /// A different version replaces the existing one
    Override,
}

/// Map of lockstep identity to version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionBag {
    versions: BTreeMap<Identity, String>,
}

impl VersionBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `version` for `identity`.
    ///
    /// Returns whether the bag changed. On conflict the bag is left untouched.
    pub fn add(&mut self, identity: Identity, version: &str, mode: AddMode) -> Result<bool> {
        match self.versions.get(&identity) {
            Some(existing) if existing == version => Ok(false),
            Some(existing) if mode == AddMode::Strict => Err(VersionError::Conflict {
                name: identity.to_string(),
                existing: existing.clone(),
                new: version.to_string(),
            }
            .into()),
            _ => {
                debug!(identity = %identity, version, "recording version");
                self.versions.insert(identity, version.to_string());
                Ok(true)
            }
        }
    }

    /// Record a package's current version under its identity
    pub fn add_package(&mut self, package: &Package) -> Result<bool> {
        self.add(package.identity(), &package.version, AddMode::Strict)
    }

    /// Consuming form of [`add`](Self::add) in strict mode
    pub fn with(mut self, identity: Identity, version: &str) -> Result<Self> {
        self.add(identity, version, AddMode::Strict)?;
        Ok(self)
    }

    /// Build a bag, failing on the first conflicting pair
    pub fn try_from_iter<I, S>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Identity, S)>,
        S: AsRef<str>,
    {
        iter.into_iter()
            .try_fold(Self::new(), |bag, (identity, version)| {
                bag.with(identity, version.as_ref())
            })
    }

    /// Version recorded for `identity`
    pub fn get(&self, identity: &Identity) -> Option<&str> {
        self.versions.get(identity).map(String::as_str)
    }

    /// Whether `identity` has a recorded version
    pub fn contains(&self, identity: &Identity) -> bool {
        self.versions.contains_key(identity)
    }

    /// Iterate over entries in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &str)> {
        self.versions.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Entries of `newer` that differ from this bag
    pub fn diff(&self, newer: &VersionBag) -> Vec<VersionChange> {
        newer
            .iter()
            .filter(|(identity, version)| self.get(identity) != Some(*version))
            .map(|(identity, version)| VersionChange {
                name: identity.to_string(),
                previous: self.get(identity).map(str::to_string),
                current: version.to_string(),
            })
            .collect()
    }
}
