//! npm registry client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use lockstep_core::collab::Registry;
use lockstep_core::config::RegistryConfig;
use lockstep_core::error::{RegistryError, Result};
use lockstep_core::range::NpmRange;

/// Package document listing every published version
#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: BTreeMap<String, serde_json::Value>,
}

/// Manifest of one published version
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

/// npm registry adapter
pub struct NpmRegistry {
    url: String,
    client: Client,
    timeout: Duration,
}

impl NpmRegistry {
    /// Create a client for the registry at `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lockstep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::RequestFailed {
                spec: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.timeout())
    }

    /// URL of a package document. Scoped names keep their `@` and encode `/`.
    fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.url, name.replace('/', "%2f"))
    }

    /// GET `url` as JSON; `None` on 404
    async fn get_json<T>(&self, url: &str, spec: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!(url, "registry request");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(spec, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::RequestFailed {
                spec: spec.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), body),
            }
            .into());
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| self.request_error(spec, e))?;
        Ok(Some(body))
    }

    fn request_error(&self, spec: &str, e: reqwest::Error) -> RegistryError {
        if e.is_timeout() {
            RegistryError::Timeout {
                spec: spec.to_string(),
                timeout: self.timeout,
            }
        } else {
            RegistryError::RequestFailed {
                spec: spec.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    #[instrument(skip(self))]
    async fn resolve_version(&self, name: &str, range: &str) -> Result<Option<String>> {
        let spec = format!("{}@{}", name, range);
        let range = NpmRange::parse(range)?;
        let Some(packument) = self
            .get_json::<Packument>(&self.package_url(name), &spec)
            .await?
        else {
            debug!(package = name, "package not published");
            return Ok(None);
        };

        let resolved = range
            .max_satisfying(packument.versions.keys().map(String::as_str))
            .map(|v| v.to_string());
        debug!(spec = %spec, resolved = ?resolved, "resolved version");
        Ok(resolved)
    }

    #[instrument(skip(self))]
    async fn manifest_dependencies(
        &self,
        name: &str,
        version: &str,
        dev: bool,
    ) -> Result<BTreeMap<String, String>> {
        let spec = format!("{}@{}", name, version);
        let url = format!("{}/{}", self.package_url(name), version);
        let manifest = self
            .get_json::<VersionManifest>(&url, &spec)
            .await?
            .ok_or_else(|| RegistryError::RequestFailed {
                spec: spec.clone(),
                reason: "version not found".to_string(),
            })?;

        Ok(if dev {
            manifest.dev_dependencies
        } else {
            manifest.dependencies
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::error::LockstepError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> NpmRegistry {
        NpmRegistry::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_package_url() {
        let registry = NpmRegistry::new("https://registry.npmjs.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.package_url("@scope/lib"),
            "https://registry.npmjs.org/@scope%2flib"
        );
        assert_eq!(registry.package_url("lib"), "https://registry.npmjs.org/lib");
    }

    #[tokio::test]
    async fn test_resolve_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "lib",
                "versions": {
                    "1.1.0": {},
                    "1.2.0": {},
                    "1.4.2": {},
                    "2.0.0": {}
                }
            })))
            .mount(&server)
            .await;

        let registry = registry(&server);
        assert_eq!(
            registry.resolve_version("lib", "^1.2.0").await.unwrap(),
            Some("1.4.2".to_string())
        );
        assert_eq!(registry.resolve_version("lib", "^3.0.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unpublished_package() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let registry = registry(&server);
        assert_eq!(registry.resolve_version("missing", "^1.0.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = registry(&server)
            .resolve_version("lib", "^1.0.0")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockstepError::Registry(RegistryError::RequestFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_manifest_dependencies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib/1.4.2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "lib",
                "version": "1.4.2",
                "dependencies": { "core": "^2.0.0" },
                "devDependencies": { "tools": "^0.1.0" }
            })))
            .mount(&server)
            .await;

        let registry = registry(&server);
        let deps = registry
            .manifest_dependencies("lib", "1.4.2", false)
            .await
            .unwrap();
        assert_eq!(deps.get("core").map(String::as_str), Some("^2.0.0"));
        let dev = registry
            .manifest_dependencies("lib", "1.4.2", true)
            .await
            .unwrap();
        assert_eq!(dev.get("tools").map(String::as_str), Some("^0.1.0"));
    }
}
