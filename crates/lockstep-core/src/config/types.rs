//! Configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monorepo::MonoRepoKind;
use crate::scheme::VersionSchemeKind;

use super::defaults::DEFAULT_REGISTRY_URL;

/// Main configuration for Lockstep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Repository and branch conventions
    pub repo: RepoConfig,

    /// Where release groups and independent packages live
    #[serde(flatten)]
    pub layout: RepoLayout,

    /// Versioning configuration
    pub versioning: VersioningConfig,

    /// Registry configuration
    pub registry: RegistryConfig,

    /// External commands
    pub commands: CommandsConfig,
}

/// Repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Partial URL used to find the upstream remote (e.g. `github.com/org/repo`)
    pub remote_url: Option<String>,

    /// Prefix of release branches
    pub release_branch_prefix: String,

    /// Branches release bumps may start from
    pub main_branches: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            release_branch_prefix: "release/".to_string(),
            main_branches: vec!["main".to_string(), "next".to_string()],
        }
    }
}

/// Package layout of the repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoLayout {
    /// Release groups versioned in lockstep
    pub release_groups: Vec<ReleaseGroupConfig>,

    /// Independently versioned packages
    pub packages: Vec<PackageConfig>,
}

/// A release group definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseGroupConfig {
    /// Release group kind
    pub kind: MonoRepoKind,

    /// Group root, relative to the repository root
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Package globs, relative to the group root
    #[serde(default = "default_group_packages")]
    pub packages: Vec<String>,

    /// Version scheme override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<VersionSchemeKind>,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_group_packages() -> Vec<String> {
    vec!["packages/*".to_string()]
}

/// Independent package pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Glob for package directories, relative to the repository root
    pub pattern: String,

    /// Group label applied to matched packages (e.g. `tools`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Versioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Default version scheme; detected from the version when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<VersionSchemeKind>,

    /// Package groups skipped by the dependency walk
    pub excluded_groups: Vec<String>,

    /// Script run after a version is set, when a package defines it
    pub genver_script: String,

    /// Publish tag format (`{name}` is the short name)
    pub tag_format: String,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            scheme: None,
            excluded_groups: vec!["tools".to_string()],
            genver_script: "build:genver".to_string(),
            tag_format: "{name}_v{version}".to_string(),
        }
    }
}

impl VersioningConfig {
    /// Render the publish tag for a short name and version
    pub fn format_tag(&self, name: &str, version: &str) -> String {
        self.tag_format
            .replace("{name}", name)
            .replace("{version}", version)
    }
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Concurrent registry requests
    pub concurrency: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_secs: 30,
            concurrency: 8,
        }
    }
}

impl RegistryConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Install command, run at the repository or group root
    pub install: String,

    /// Policy check command run in fix mode before releases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_check: Option<String>,

    /// Timeout for package manager and policy commands, in seconds
    pub timeout_secs: u64,

    /// Timeout for each git command, in seconds
    pub git_timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            install: "npm install".to_string(),
            policy_check: None,
            timeout_secs: 600,
            git_timeout_secs: 120,
        }
    }
}

impl CommandsConfig {
    /// Package manager command timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Git command timeout
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}
