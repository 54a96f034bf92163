//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks `<dir>/<name>` and then
/// `<dir>/.github/<name>`. The first match wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Directory the configuration applies to.
///
/// Files under `.github/` describe the repository one level up.
pub fn config_root(config_path: &Path) -> PathBuf {
    let dir = config_path.parent().unwrap_or(Path::new("."));
    if dir.file_name().is_some_and(|n| n == ".github") {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monorepo::MonoRepoKind;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_parents() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("lockstep.yaml");
        std::fs::write(&config_path, "repo:\n  main_branches: [main]\n").unwrap();
        let nested = temp.path().join("packages").join("a");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested).unwrap(), config_path);
    }

    #[test]
    fn test_find_config_in_github_dir() {
        let temp = TempDir::new().unwrap();
        let github_dir = temp.path().join(".github");
        std::fs::create_dir_all(&github_dir).unwrap();
        let config_path = github_dir.join("lockstep.toml");
        std::fs::write(&config_path, "[registry]\ntimeout_secs = 5\n").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, config_path);
        assert_eq!(config_root(&found), temp.path());
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("lockstep.yaml");
        std::fs::write(
            &config_path,
            "release_groups:\n  - kind: client\n    directory: client\n    packages: [\"packages/*\"]\nregistry:\n  concurrency: 2\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.layout.release_groups.len(), 1);
        assert_eq!(config.layout.release_groups[0].kind, MonoRepoKind::client());
        assert_eq!(config.registry.concurrency, 2);
        assert_eq!(config.registry.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("lockstep.toml");
        std::fs::write(
            &config_path,
            "[[packages]]\npattern = \"tools/*\"\ngroup = \"tools\"\n\n[versioning]\nscheme = \"virtualPatch\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.layout.packages[0].group.as_deref(), Some("tools"));
        assert_eq!(
            config.versioning.scheme,
            Some(crate::scheme::VersionSchemeKind::VirtualPatch)
        );
    }
}
