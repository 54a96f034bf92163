//! Error types for Lockstep

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using LockstepError
pub type Result<T> = std::result::Result<T, LockstepError>;

/// Main error type for Lockstep operations
#[derive(Debug, Error)]
pub enum LockstepError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Version-related errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Registry-related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Adapter-related errors
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Workflow-related errors
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// A git subprocess exited unsuccessfully
    #[error("Unable to {label}: {stderr}")]
    CommandFailed { label: String, stderr: String },

    /// A git subprocess did not finish in time
    #[error("Timed out after {timeout:?} trying to {label}")]
    Timeout { label: String, timeout: Duration },

    /// No remote matches the configured URL
    #[error("Missing remote for '{0}'")]
    RemoteNotFound(String),

    /// Branch already exists
    #[error("Branch '{0}' already exists")]
    BranchExists(String),

    /// HEAD is not on a branch
    #[error("HEAD is detached; a branch must be checked out")]
    DetachedHead,

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(String),
}

/// Version-related errors
#[derive(Debug, Error)]
pub enum VersionError {
    /// Failed to parse version
    #[error("Failed to parse version '{0}': {1}")]
    ParseFailed(String, String),

    /// Failed to parse a dependency range
    #[error("Failed to parse version range '{0}': {1}")]
    RangeParseFailed(String, String),

    /// Bump type not valid for the scheme
    #[error("Invalid bump type '{bump}' for {scheme} scheme")]
    InvalidBumpType { bump: String, scheme: String },

    /// Virtual patch versions must stay below 1.0
    #[error("Can't use virtual patch with major version {major} ({version})")]
    VirtualPatchMajor { version: String, major: u64 },

    /// Scheme has no arithmetic
    #[error("Version scheme '{0}' is not supported")]
    SchemeUnsupported(String),

    /// Two different versions recorded for the same lockstep identity
    #[error("Inconsistent version for {name}: {existing} != {new}")]
    Conflict {
        name: String,
        existing: String,
        new: String,
    },

    /// Two different non-dev references for the same identity
    #[error(
        "Inconsistent dependency version for {name}: {existing} ({existing_ref}) != {new} ({new_ref})"
    )]
    ReferenceConflict {
        name: String,
        existing: String,
        existing_ref: String,
        new: String,
        new_ref: String,
    },
}

/// Registry lookup errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No published version satisfies a range that is referenced
    #[error("No published version of {name} matches {range} (referenced by {referrer})")]
    NoMatchingVersion {
        name: String,
        range: String,
        referrer: String,
    },

    /// Request to the registry failed
    #[error("Registry request for {spec} failed: {reason}")]
    RequestFailed { spec: String, reason: String },

    /// Registry call did not finish in time
    #[error("Registry request for {spec} timed out after {timeout:?}")]
    Timeout { spec: String, timeout: Duration },
}

/// Adapter-related errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Package manifest not found
    #[error("Package manifest not found at {0}")]
    ManifestNotFound(PathBuf),

    /// Failed to parse manifest
    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParseError { path: PathBuf, reason: String },

    /// Failed to update manifest
    #[error("Failed to update manifest: {0}")]
    ManifestUpdateError(String),

    /// Command execution failed
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    /// Command did not finish in time
    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimeout { command: String, timeout: Duration },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Workflow-related errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Policy check left changes in the working tree
    #[error("Policy check fixed files: {0}\nCommit the fixes and re-run")]
    PolicyCheckDirty(String),

    /// Local branch and remote branch disagree
    #[error("Local branch '{branch}' is not up to date with {remote}/{branch}")]
    BranchNotUpToDate { branch: String, remote: String },

    /// Release attempted off a non-release branch
    #[error("Branch '{branch}' is not a release branch (expected prefix '{prefix}')")]
    NotReleaseBranch { branch: String, prefix: String },

    /// Release bump attempted off a non-main branch
    #[error("Release bumps must start from one of [{allowed}], not '{branch}'")]
    NotMainBranch { branch: String, allowed: String },

    /// Unsupported bump type for the operation
    #[error("Unsupported bump type '{bump}' for {operation}")]
    UnsupportedBumpType { bump: String, operation: String },

    /// Private package used as a runtime dependency across release groups
    #[error("Private package {dependency} cannot be a non-dev dependency of {package}")]
    PrivateDependency { package: String, dependency: String },

    /// Same release group dependency with a non-exact range
    #[error(
        "Inconsistent range in release group {group}: {package} depends on {dependency}@{range}, expected ^{expected}"
    )]
    ReleaseGroupRangeMismatch {
        group: String,
        package: String,
        dependency: String,
        range: String,
        expected: String,
    },

    /// Prerelease dependencies on already released packages
    #[error("Prerelease dependencies on released packages must be updated first:\n{0}")]
    PrereleaseDependencies(String),

    /// The release line branch already exists
    #[error("Release branch '{0}' already exists")]
    ReleaseBranchExists(String),

    /// Nothing to release
    #[error("Nothing to release for {0}")]
    NothingToRelease(String),

    /// Unknown package or release group
    #[error("Unknown package or release group '{0}'")]
    UnknownTarget(String),

    /// Package manager install failed
    #[error("Install failed for {0}")]
    InstallFailed(String),
}

impl LockstepError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the checkout may hold changes from this run that a rollback
    /// should undo.
    ///
    /// Configuration and parse errors are raised before anything is touched.
    pub fn requires_rollback(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::Toml(_) | Self::Workflow(WorkflowError::UnknownTarget(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_versions() {
        let err = LockstepError::from(VersionError::Conflict {
            name: "client".to_string(),
            existing: "1.2.0".to_string(),
            new: "1.3.0".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("client"));
        assert!(msg.contains("1.2.0"));
        assert!(msg.contains("1.3.0"));
    }

    #[test]
    fn test_requires_rollback() {
        let config = LockstepError::from(ConfigError::NotFound(PathBuf::from("/tmp")));
        assert!(!config.requires_rollback());

        let stale = LockstepError::from(WorkflowError::BranchNotUpToDate {
            branch: "main".to_string(),
            remote: "origin".to_string(),
        });
        assert!(stale.requires_rollback());
    }
}
