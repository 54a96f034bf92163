//! Version scheme registry

use std::sync::Arc;

use tracing::debug;

use super::{InternalScheme, SemverScheme, VersionScheme, VersionSchemeKind, VirtualPatchScheme};

/// Registry of version schemes
pub struct SchemeRegistry {
    schemes: Vec<Arc<dyn VersionScheme>>,
}

impl SchemeRegistry {
    /// Create a registry with the built-in schemes
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(SemverScheme);
        registry.register(VirtualPatchScheme);
        registry.register(InternalScheme);
        registry
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            schemes: Vec::new(),
        }
    }

    /// Register a scheme, replacing any scheme with the same kind
    pub fn register<S: VersionScheme + 'static>(&mut self, scheme: S) {
        self.schemes.retain(|s| s.kind() != scheme.kind());
        self.schemes.push(Arc::new(scheme));
    }

    /// Get the scheme for a kind
    pub fn get(&self, kind: VersionSchemeKind) -> Option<Arc<dyn VersionScheme>> {
        debug!(scheme = %kind, "looking up version scheme");
        self.schemes.iter().find(|s| s.kind() == kind).cloned()
    }

    /// Registered scheme kinds
    pub fn kinds(&self) -> Vec<VersionSchemeKind> {
        self.schemes.iter().map(|s| s.kind()).collect()
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemes() {
        let registry = SchemeRegistry::new();
        assert_eq!(
            registry.kinds(),
            vec![
                VersionSchemeKind::Semver,
                VersionSchemeKind::VirtualPatch,
                VersionSchemeKind::Internal
            ]
        );
        assert!(registry.get(VersionSchemeKind::VirtualPatch).is_some());
    }

    #[test]
    fn test_empty_registry() {
        let registry = SchemeRegistry::empty();
        assert!(registry.get(VersionSchemeKind::Semver).is_none());
    }

    #[test]
    fn test_register_replaces_kind() {
        let mut registry = SchemeRegistry::new();
        registry.register(SemverScheme);
        assert_eq!(registry.kinds().len(), 3);
    }
}
