//! Default configuration values

use super::types::Config;

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "lockstep.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "lockstep.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".lockstep.yaml";

/// Default npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".lockstep.toml",
    ]
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    let config = Config::default();
    serde_yaml::to_string(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Lockstep Configuration

repo:
  remote_url: github.com/example/monorepo
  release_branch_prefix: release/
  main_branches: [main, next]

release_groups:
  - kind: client
    directory: .
    packages: ["packages/*/*"]
  - kind: server
    directory: server/routerlicious
    packages: ["packages/*"]

packages:
  - pattern: "common/lib/*"
  - pattern: "tools/*"
    group: tools

versioning:
  excluded_groups: [tools]
  genver_script: "build:genver"
  tag_format: "{name}_v{version}"

registry:
  url: https://registry.npmjs.org
  timeout_secs: 30
  concurrency: 8

commands:
  install: npm install
  timeout_secs: 600
  git_timeout_secs: 120
"#;
