//! Version bag with provenance

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, VersionError};
use crate::monorepo::Identity;

use super::VersionBag;

/// Reconciled version of one identity and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Reconciled version
    pub version: String,
    /// Human-readable source (e.g. `@scope/app -> dep@^1.2.0`)
    pub reference: String,
    /// Whether the version was resolved from the registry
    pub published: bool,
}

/// Version bag that records provenance for each entry.
///
/// Built by the dependency walk. Entries reached only through dev
/// dependencies can be overridden by a later runtime reference; conflicting
/// runtime references are fatal unless both sides come from the registry.
#[derive(Debug, Clone)]
pub struct ReferenceVersionBag {
    entries: BTreeMap<Identity, Reference>,
    non_dev_dep: HashSet<Identity>,
    published_package: HashSet<String>,
    published_package_range: HashSet<String>,
    repo_versions: VersionBag,
}

impl ReferenceVersionBag {
    /// Create an empty bag over the repository's current versions
    pub fn new(repo_versions: VersionBag) -> Self {
        Self {
            entries: BTreeMap::new(),
            non_dev_dep: HashSet::new(),
            published_package: HashSet::new(),
            published_package_range: HashSet::new(),
            repo_versions,
        }
    }

    /// Record a version reference for `identity`
    pub fn add(
        &mut self,
        identity: Identity,
        version: &str,
        reference: impl Into<String>,
        dev: bool,
        published: bool,
    ) -> Result<()> {
        let reference = reference.into();

        let Some(existing) = self.entries.get_mut(&identity) else {
            debug!(identity = %identity, version, reference = %reference, dev, published, "new reference");
            if !dev {
                self.non_dev_dep.insert(identity.clone());
            }
            self.entries.insert(
                identity,
                Reference {
                    version: version.to_string(),
                    reference,
                    published,
                },
            );
            return Ok(());
        };

        if existing.version == version {
            existing.published |= published;
            if !dev {
                self.non_dev_dep.insert(identity);
            }
            return Ok(());
        }

        if dev {
            warn!(
                identity = %identity,
                kept = %existing.version,
                kept_ref = %existing.reference,
                ignored = version,
                ignored_ref = %reference,
                "mismatched dev dependency version, keeping first"
            );
            return Ok(());
        }

        if !self.non_dev_dep.contains(&identity) {
            debug!(
                identity = %identity,
                previous = %existing.version,
                version,
                "runtime reference overrides dev-only reference"
            );
            *existing = Reference {
                version: version.to_string(),
                reference,
                published,
            };
            self.non_dev_dep.insert(identity);
            return Ok(());
        }

        if existing.published && published {
            warn!(
                identity = %identity,
                kept = %existing.version,
                kept_ref = %existing.reference,
                ignored = version,
                ignored_ref = %reference,
                "conflicting published dependency versions"
            );
            return Ok(());
        }

        Err(VersionError::ReferenceConflict {
            name: identity.to_string(),
            existing: existing.version.clone(),
            existing_ref: existing.reference.clone(),
            new: version.to_string(),
            new_ref: reference,
        }
        .into())
    }

    /// Remember a published `name@range`. Returns false if already seen.
    pub fn mark_published_range(&mut self, name: &str, range: &str) -> bool {
        self.published_package_range
            .insert(format!("{}@{}", name, range))
    }

    /// Remember a published `name@version`. Returns false if already seen.
    pub fn mark_published_package(&mut self, name: &str, version: &str) -> bool {
        self.published_package.insert(format!("{}@{}", name, version))
    }

    /// Reconciled version of `identity`
    pub fn version(&self, identity: &Identity) -> Option<&str> {
        self.entries.get(identity).map(|r| r.version.as_str())
    }

    /// Reference recorded for `identity`
    pub fn get(&self, identity: &Identity) -> Option<&Reference> {
        self.entries.get(identity)
    }

    /// Whether the reconciled version is the repository's current version
    pub fn need_bump(&self, identity: &Identity) -> bool {
        match (self.version(identity), self.repo_versions.get(identity)) {
            (Some(reconciled), Some(repo)) => reconciled == repo,
            _ => false,
        }
    }

    /// Whether the identity needs bumping and was never published at this version
    pub fn need_release(&self, identity: &Identity) -> bool {
        self.need_bump(identity) && self.entries.get(identity).is_some_and(|r| !r.published)
    }

    /// Whether any runtime edge reached `identity`
    pub fn is_non_dev(&self, identity: &Identity) -> bool {
        self.non_dev_dep.contains(identity)
    }

    /// Iterate over entries in identity order
    pub fn entries(&self) -> impl Iterator<Item = (&Identity, &Reference)> {
        self.entries.iter()
    }

    /// Repository versions the bag was built against
    pub fn repo_versions(&self) -> &VersionBag {
        &self.repo_versions
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
