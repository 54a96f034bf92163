//! Packages and their manifest-declared dependencies

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdapterError, Result};

use super::{Identity, MonoRepoKind};

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// A declared dependency of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Dependency package name
    pub name: String,
    /// Declared version range
    pub range: String,
    /// Whether the edge comes from `devDependencies`
    pub dev: bool,
}

/// A package in the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Package name
    pub name: String,
    /// Current version
    pub version: String,
    /// Package directory
    pub directory: PathBuf,
    /// Whether the package is marked private
    pub private: bool,
    /// Group label from configuration (e.g. `tools`)
    pub group: Option<String>,
    /// Release group the package belongs to
    pub release_group: Option<MonoRepoKind>,
    /// `dependencies` followed by `devDependencies`, in manifest order
    pub dependencies: Vec<DependencyEdge>,
    /// Script names defined by the manifest
    pub scripts: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    name: String,
    version: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    dependencies: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    scripts: serde_json::Map<String, serde_json::Value>,
}

impl Package {
    /// Load a package from the manifest in `directory`
    pub fn load(
        directory: &Path,
        release_group: Option<MonoRepoKind>,
        group: Option<String>,
    ) -> Result<Self> {
        let manifest_path = directory.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(AdapterError::ManifestNotFound(manifest_path).into());
        }

        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| AdapterError::ManifestParseError {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;

        let edges = |deps: serde_json::Map<String, serde_json::Value>, dev: bool| {
            deps.into_iter()
                .filter_map(move |(name, range)| {
                    range.as_str().map(|range| DependencyEdge {
                        name,
                        range: range.to_string(),
                        dev,
                    })
                })
                .collect::<Vec<_>>()
        };

        let mut dependencies = edges(manifest.dependencies, false);
        dependencies.extend(edges(manifest.dev_dependencies, true));

        debug!(
            name = %manifest.name,
            version = %manifest.version,
            dependencies = dependencies.len(),
            "loaded package"
        );

        Ok(Self {
            name: manifest.name,
            version: manifest.version,
            directory: directory.to_path_buf(),
            private: manifest.private,
            group,
            release_group,
            dependencies,
            scripts: manifest.scripts.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// Path of the package manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE)
    }

    /// Lockstep identity of the package
    pub fn identity(&self) -> Identity {
        Identity::of(self)
    }

    /// Whether the manifest defines `script`
    pub fn has_script(&self, script: &str) -> bool {
        self.scripts.contains(script)
    }

    /// Declared dependency on `name`, if any
    pub fn dependency(&self, name: &str) -> Option<&DependencyEdge> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Rewrite every declared range on `name`. Returns whether anything changed.
    pub fn set_dependency_range(&mut self, name: &str, range: &str) -> bool {
        let mut changed = false;
        for dep in self.dependencies.iter_mut().filter(|d| d.name == name) {
            if dep.range != range {
                dep.range = range.to_string();
                changed = true;
            }
        }
        changed
    }

    /// Whether the package shares a release group with `other`
    pub fn same_release_group(&self, other: &Package) -> bool {
        self.release_group.is_some() && self.release_group == other.release_group
    }
}
