//! npm package.json handling

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use lockstep_core::collab::ManifestWriter;
use lockstep_core::error::{AdapterError, Result};
use lockstep_core::monorepo::Package;

const DEPENDENCIES: &str = "dependencies";
const DEV_DEPENDENCIES: &str = "devDependencies";

/// package.json contents, with key order preserved
#[derive(Debug, Clone)]
pub struct PackageJson {
    fields: Map<String, Value>,
}

impl PackageJson {
    /// Load package.json from path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| AdapterError::ManifestNotFound(path.to_path_buf()))?;

        let fields = serde_json::from_str(&content).map_err(|e| AdapterError::ManifestParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { fields })
    }

    /// Save package.json to path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.fields)
            .map_err(|e| AdapterError::ManifestUpdateError(e.to_string()))?;

        // Ensure trailing newline
        let content = if content.ends_with('\n') {
            content
        } else {
            format!("{}\n", content)
        };

        std::fs::write(path, content)
            .map_err(|e| AdapterError::ManifestUpdateError(e.to_string()).into())
    }

    /// Package name
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Package version
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Set the package version
    pub fn set_version(&mut self, version: &str) {
        self.fields
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Declared range of a dependency
    pub fn dependency(&self, name: &str, dev: bool) -> Option<&str> {
        self.fields
            .get(section(dev))
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    /// Rewrite the range of an already declared dependency.
    ///
    /// Returns whether the manifest changed.
    pub fn set_dependency(&mut self, name: &str, range: &str, dev: bool) -> bool {
        let Some(slot) = self
            .fields
            .get_mut(section(dev))
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.get_mut(name))
        else {
            return false;
        };
        if slot.as_str() == Some(range) {
            return false;
        }
        *slot = Value::String(range.to_string());
        true
    }
}

fn section(dev: bool) -> &'static str {
    if dev {
        DEV_DEPENDENCIES
    } else {
        DEPENDENCIES
    }
}

/// Writes in-memory package changes back to package.json
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageJsonWriter;

impl PackageJsonWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ManifestWriter for PackageJsonWriter {
    async fn save_package(&self, package: &Package) -> Result<()> {
        let path = package.manifest_path();
        let mut manifest = PackageJson::load(&path)?;
        manifest.set_version(&package.version);
        for dep in &package.dependencies {
            manifest.set_dependency(&dep.name, &dep.range, dep.dev);
        }
        manifest.save(&path)?;
        debug!(package = %package.name, path = %path.display(), "saved manifest");
        Ok(())
    }
}
