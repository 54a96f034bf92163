//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_repo(config)?;
    validate_layout(config)?;
    validate_versioning(config)?;
    validate_limits(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_repo(config: &Config) -> Result<()> {
    if config.repo.release_branch_prefix.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "repo.release_branch_prefix".to_string(),
            message: "prefix cannot be empty".to_string(),
        }
        .into());
    }

    if config.repo.main_branches.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "repo.main_branches".to_string(),
            message: "at least one main branch is required".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_layout(config: &Config) -> Result<()> {
    let mut kinds = HashSet::new();
    for (i, group) in config.layout.release_groups.iter().enumerate() {
        if group.kind.as_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("release_groups[{}].kind", i),
                message: "kind cannot be empty".to_string(),
            }
            .into());
        }
        if !kinds.insert(group.kind.clone()) {
            return Err(ConfigError::InvalidValue {
                field: format!("release_groups[{}].kind", i),
                message: format!("duplicate release group '{}'", group.kind),
            }
            .into());
        }
        if group.packages.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("release_groups[{}].packages", i),
                message: "at least one package glob is required".to_string(),
            }
            .into());
        }
    }

    for (i, package) in config.layout.packages.iter().enumerate() {
        if package.pattern.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("packages[{}].pattern", i),
                message: "pattern cannot be empty".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_versioning(config: &Config) -> Result<()> {
    if !config.versioning.tag_format.contains("{version}") {
        return Err(ConfigError::InvalidValue {
            field: "versioning.tag_format".to_string(),
            message: "must contain {version} placeholder".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_limits(config: &Config) -> Result<()> {
    let limits = [
        ("registry.timeout_secs", config.registry.timeout_secs as usize),
        ("registry.concurrency", config.registry.concurrency),
        ("commands.timeout_secs", config.commands.timeout_secs as usize),
        ("commands.git_timeout_secs", config.commands.git_timeout_secs as usize),
    ];
    for (field, value) in limits {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
    }

    Ok(())
}
